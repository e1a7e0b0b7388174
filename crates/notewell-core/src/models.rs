//! Core data models for notewell.
//!
//! These types are shared across the notewell crates and represent the
//! note entity and its request/response shapes. JSON serialization is
//! camelCase throughout, matching what the web client consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default page number for list requests.
pub const DEFAULT_PAGE: i64 = 1;

/// Default page size for list requests.
pub const DEFAULT_LIMIT: i64 = 6;

// =============================================================================
// NOTE TYPES
// =============================================================================

/// Lifecycle state of a note.
///
/// The trash bin is modeled as a status on the single note entity rather
/// than a separate collection; trashing and restoring flip this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    Active,
    Trashed,
}

impl NoteStatus {
    /// Database/string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteStatus::Active => "active",
            NoteStatus::Trashed => "trashed",
        }
    }
}

impl std::fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NoteStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(NoteStatus::Active),
            "trashed" => Ok(NoteStatus::Trashed),
            other => Err(crate::Error::Internal(format!(
                "unknown note status: {}",
                other
            ))),
        }
    }
}

/// A single note record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub pinned: bool,
    pub status: NoteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

/// Request to create a note.
///
/// Unknown fields in the incoming JSON are ignored; everything the schema
/// allows is persisted verbatim. Length bounds are enforced by the store's
/// schema constraints, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    pub text: Option<String>,
    pub label: Option<String>,
    pub color: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub pinned: bool,
}

/// Partial update of a note.
///
/// Only this field set is ever written; fields omitted from the request
/// are left unchanged, and anything else on the record is untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub text: Option<String>,
    pub label: Option<String>,
    pub color: Option<String>,
    pub body: Option<String>,
    pub pinned: Option<bool>,
}

impl UpdateNoteRequest {
    /// True when no whitelisted field is present.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.text.is_none()
            && self.label.is_none()
            && self.color.is_none()
            && self.body.is_none()
            && self.pinned.is_none()
    }
}

/// List query resolved against defaults.
#[derive(Debug, Clone)]
pub struct ListNotesRequest {
    /// Status scope: active notes or the trash bin.
    pub status: NoteStatus,
    /// Case-insensitive substring match against title OR label.
    pub search: Option<String>,
    pub page: i64,
    pub limit: i64,
}

impl ListNotesRequest {
    pub fn new(status: NoteStatus) -> Self {
        Self {
            status,
            search: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Rows to skip for the requested page. Pages below 1 behave as the
    /// first page.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit
    }
}

/// Envelope returned by every list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotesResponse {
    pub total_notes: i64,
    pub num_of_pages: i64,
    pub notes: Vec<Note>,
}

impl ListNotesResponse {
    /// Build the envelope, computing `num_of_pages = ceil(total / limit)`.
    pub fn new(notes: Vec<Note>, total_notes: i64, limit: i64) -> Self {
        let num_of_pages = if limit > 0 {
            (total_notes + limit - 1) / limit
        } else {
            0
        };
        Self {
            total_notes,
            num_of_pages,
            notes,
        }
    }
}
