//! Note repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use notewell_core::{
    new_v7, CreateNoteRequest, Error, ListNotesRequest, ListNotesResponse, Note, NoteRepository,
    NoteStatus, Result, UpdateNoteRequest,
};

use crate::escape_like;

/// Column list shared by every SELECT/RETURNING in this module.
const NOTE_COLUMNS: &str =
    "id, title, text, label, color, body, pinned, status, created_at, updated_at";

/// Pinned notes first, then newest creation first. The UUIDv7 id is the
/// tiebreak within one millisecond, matching insertion order.
const LIST_ORDER_CLAUSE: &str = "ORDER BY pinned DESC, created_at DESC, id DESC";

/// PostgreSQL implementation of NoteRepository.
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

// =============================================================================
// HELPER FUNCTIONS FOR LIST QUERY BUILDING
// =============================================================================

/// Build the WHERE clause for a list query. `$1` is the status; the
/// search pattern, when present, binds as `$2`.
fn build_list_filter(has_search: bool) -> String {
    let mut clause = String::from("WHERE status = $1 ");
    if has_search {
        clause.push_str("AND (title ILIKE $2 ESCAPE '\\' OR label ILIKE $2 ESCAPE '\\') ");
    }
    clause
}

/// Turn a raw search string into an ILIKE pattern, or None when blank.
fn build_search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)))
}

/// Map a database row to a Note.
fn map_row_to_note(row: &PgRow) -> Result<Note> {
    let status: String = row.get("status");
    Ok(Note {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        label: row.get("label"),
        color: row.get("color"),
        body: row.get("body"),
        pinned: row.get("pinned"),
        status: status.parse()?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, status: NoteStatus, req: CreateNoteRequest) -> Result<Note> {
        let id = new_v7();
        let now = Utc::now();

        let sql = format!(
            "INSERT INTO note (id, title, text, label, color, body, pinned, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
             RETURNING {NOTE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&req.title)
            .bind(&req.text)
            .bind(&req.label)
            .bind(&req.color)
            .bind(&req.body)
            .bind(req.pinned)
            .bind(status.as_str())
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        map_row_to_note(&row)
    }

    async fn fetch(&self, id: Uuid, status: NoteStatus) -> Result<Note> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM note WHERE id = $1 AND status = $2");
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        match row {
            Some(row) => map_row_to_note(&row),
            None => Err(Error::NoteNotFound(id)),
        }
    }

    async fn list(&self, req: ListNotesRequest) -> Result<ListNotesResponse> {
        if req.limit < 1 {
            return Err(Error::InvalidInput("limit must be >= 1".to_string()));
        }

        let pattern = build_search_pattern(req.search.as_deref());
        let filter = build_list_filter(pattern.is_some());

        let count_sql = format!("SELECT COUNT(*) FROM note {filter}");
        let mut count_query = sqlx::query_scalar(&count_sql).bind(req.status.as_str());
        if let Some(pattern) = &pattern {
            count_query = count_query.bind(pattern);
        }
        let total_notes: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        // limit/offset bind after the filter params
        let (limit_idx, offset_idx) = if pattern.is_some() { (3, 4) } else { (2, 3) };
        let list_sql = format!(
            "SELECT {NOTE_COLUMNS} FROM note {filter}{LIST_ORDER_CLAUSE} LIMIT ${limit_idx} OFFSET ${offset_idx}"
        );
        let mut list_query = sqlx::query(&list_sql).bind(req.status.as_str());
        if let Some(pattern) = &pattern {
            list_query = list_query.bind(pattern);
        }
        let rows = list_query
            .bind(req.limit)
            .bind(req.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let notes = rows
            .iter()
            .map(map_row_to_note)
            .collect::<Result<Vec<_>>>()?;

        Ok(ListNotesResponse::new(notes, total_notes, req.limit))
    }

    async fn update(&self, id: Uuid, req: UpdateNoteRequest) -> Result<Note> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Snapshot is taken under FOR UPDATE so the returned pre-update
        // state is consistent with what the SET clause applies to.
        let sql = format!(
            "SELECT {NOTE_COLUMNS} FROM note WHERE id = $1 AND status = 'active' FOR UPDATE"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?;
        let snapshot = match row {
            Some(row) => map_row_to_note(&row)?,
            None => return Err(Error::NoteNotFound(id)),
        };

        if !req.is_empty() {
            // $1 = now, $2 = id, then dynamic params start at $3
            let mut updates: Vec<String> = vec!["updated_at = $1".to_string()];
            let mut param_idx = 3;

            if req.title.is_some() {
                updates.push(format!("title = ${}", param_idx));
                param_idx += 1;
            }
            if req.text.is_some() {
                updates.push(format!("text = ${}", param_idx));
                param_idx += 1;
            }
            if req.label.is_some() {
                updates.push(format!("label = ${}", param_idx));
                param_idx += 1;
            }
            if req.color.is_some() {
                updates.push(format!("color = ${}", param_idx));
                param_idx += 1;
            }
            if req.body.is_some() {
                updates.push(format!("body = ${}", param_idx));
                param_idx += 1;
            }
            if req.pinned.is_some() {
                updates.push(format!("pinned = ${}", param_idx));
            }

            let sql = format!("UPDATE note SET {} WHERE id = $2", updates.join(", "));

            let mut query = sqlx::query(&sql).bind(Utc::now()).bind(id);
            if let Some(title) = &req.title {
                query = query.bind(title);
            }
            if let Some(text) = &req.text {
                query = query.bind(text);
            }
            if let Some(label) = &req.label {
                query = query.bind(label);
            }
            if let Some(color) = &req.color {
                query = query.bind(color);
            }
            if let Some(body) = &req.body {
                query = query.bind(body);
            }
            if let Some(pinned) = req.pinned {
                query = query.bind(pinned);
            }

            query.execute(&mut *tx).await.map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(snapshot)
    }

    async fn delete(&self, id: Uuid, status: NoteStatus) -> Result<bool> {
        let result = sqlx::query("DELETE FROM note WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn trash(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE note SET status = 'trashed', updated_at = $1 WHERE id = $2 AND status = 'active'",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    async fn restore(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE note SET status = 'active', updated_at = $1 WHERE id = $2 AND status = 'trashed'",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    async fn exists(&self, id: Uuid, status: NoteStatus) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM note WHERE id = $1 AND status = $2)")
                .bind(id)
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filter_without_search() {
        let clause = build_list_filter(false);
        assert_eq!(clause, "WHERE status = $1 ");
    }

    #[test]
    fn test_list_filter_with_search_matches_title_or_label() {
        let clause = build_list_filter(true);
        assert!(clause.contains("title ILIKE $2"));
        assert!(clause.contains("label ILIKE $2"));
        assert!(clause.contains("OR"));
    }

    #[test]
    fn test_search_pattern_wraps_in_wildcards() {
        assert_eq!(build_search_pattern(Some("grocery")).unwrap(), "%grocery%");
    }

    #[test]
    fn test_search_pattern_escapes_user_wildcards() {
        assert_eq!(build_search_pattern(Some("50%")).unwrap(), "%50\\%%");
        assert_eq!(build_search_pattern(Some("a_b")).unwrap(), "%a\\_b%");
    }

    #[test]
    fn test_search_pattern_blank_is_none() {
        assert!(build_search_pattern(None).is_none());
        assert!(build_search_pattern(Some("")).is_none());
        assert!(build_search_pattern(Some("   ")).is_none());
    }

    #[test]
    fn test_order_clause_sorts_pinned_first_then_newest() {
        assert!(LIST_ORDER_CLAUSE.starts_with("ORDER BY pinned DESC"));
        let pinned_pos = LIST_ORDER_CLAUSE.find("pinned DESC").unwrap();
        let created_pos = LIST_ORDER_CLAUSE.find("created_at DESC").unwrap();
        assert!(pinned_pos < created_pos);
    }
}
