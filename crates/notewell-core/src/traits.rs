//! Repository trait definitions.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    CreateNoteRequest, ListNotesRequest, ListNotesResponse, Note, NoteStatus, Result,
    UpdateNoteRequest,
};

/// Persistence operations over note records.
///
/// All id-scoped operations are also status-scoped: the notes API never
/// sees trashed rows and the bin API never sees active ones.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a new note in the given status, assigning id and timestamps.
    async fn insert(&self, status: NoteStatus, req: CreateNoteRequest) -> Result<Note>;

    /// Fetch a note by id within a status scope.
    async fn fetch(&self, id: Uuid, status: NoteStatus) -> Result<Note>;

    /// List notes with search and pagination.
    async fn list(&self, req: ListNotesRequest) -> Result<ListNotesResponse>;

    /// Partially update an active note over the whitelisted field set.
    ///
    /// Returns the record as it existed BEFORE the update. This is the
    /// documented contract of the update endpoint; do not change it to
    /// return the post-update row.
    async fn update(&self, id: Uuid, req: UpdateNoteRequest) -> Result<Note>;

    /// Hard-delete a note within a status scope.
    ///
    /// Returns whether a row was actually removed.
    async fn delete(&self, id: Uuid, status: NoteStatus) -> Result<bool>;

    /// Move an active note to the bin.
    async fn trash(&self, id: Uuid) -> Result<()>;

    /// Move a trashed note back to active.
    async fn restore(&self, id: Uuid) -> Result<()>;

    /// Check if a note exists within a status scope.
    async fn exists(&self, id: Uuid, status: NoteStatus) -> Result<bool>;
}
