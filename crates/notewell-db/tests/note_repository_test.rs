//! Integration tests for the note repository.
//!
//! These tests require a migrated PostgreSQL database; run them with
//! `cargo test -- --ignored` once `DATABASE_URL` points at one.

use std::time::Duration;

use notewell_db::test_fixtures::{note_request, TestDatabase};
use notewell_db::{
    CreateNoteRequest, Error, ListNotesRequest, NoteRepository, NoteStatus, UpdateNoteRequest,
};
use uuid::Uuid;

async fn connect(prefix: &str) -> TestDatabase {
    dotenvy::dotenv().ok();
    TestDatabase::new(prefix).await
}

fn list_request(status: NoteStatus, search: &str, page: i64, limit: i64) -> ListNotesRequest {
    ListNotesRequest {
        status,
        search: Some(search.to_string()),
        page,
        limit,
    }
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_insert_persists_fields_and_assigns_identity() {
    let test_db = connect("it-insert").await;

    let req = CreateNoteRequest {
        title: test_db.title("Grocery List"),
        text: Some("milk, eggs".to_string()),
        label: Some("errands".to_string()),
        color: Some("#fff8b8".to_string()),
        body: Some("remember the market closes at six".to_string()),
        pinned: true,
    };
    let note = test_db
        .db
        .notes
        .insert(NoteStatus::Active, req.clone())
        .await
        .unwrap();

    assert_eq!(note.title, req.title);
    assert_eq!(note.text, req.text);
    assert_eq!(note.label, req.label);
    assert_eq!(note.color, req.color);
    assert_eq!(note.body, req.body);
    assert!(note.pinned);
    assert_eq!(note.status, NoteStatus::Active);
    assert_eq!(note.created_at, note.updated_at);

    let other = test_db
        .db
        .notes
        .insert(NoteStatus::Active, note_request(&test_db.title("Other")))
        .await
        .unwrap();
    assert_ne!(note.id, other.id);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_pagination_and_pinned_ordering() {
    let test_db = connect("it-paging").await;

    // 10 matching notes, every third one pinned (3 pinned total)
    for i in 0..10 {
        let req = CreateNoteRequest {
            title: test_db.title(&format!("note {}", i)),
            pinned: i % 3 == 0,
            ..Default::default()
        };
        test_db.db.notes.insert(NoteStatus::Active, req).await.unwrap();
        // keep created_at strictly ordered
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let page1 = test_db
        .db
        .notes
        .list(list_request(NoteStatus::Active, "it-paging", 1, 6))
        .await
        .unwrap();
    let page2 = test_db
        .db
        .notes
        .list(list_request(NoteStatus::Active, "it-paging", 2, 6))
        .await
        .unwrap();

    assert_eq!(page1.total_notes, 10);
    assert_eq!(page1.num_of_pages, 2);
    assert_eq!(page1.notes.len(), 6);
    assert_eq!(page2.notes.len(), 4);

    // All pinned rows sort before any unpinned row
    let combined: Vec<_> = page1.notes.iter().chain(page2.notes.iter()).collect();
    let first_unpinned = combined.iter().position(|n| !n.pinned).unwrap();
    assert!(combined[..first_unpinned].iter().all(|n| n.pinned));
    assert!(combined[first_unpinned..].iter().all(|n| !n.pinned));

    // Descending creation order within each group
    for group in [
        &combined[..first_unpinned],
        &combined[first_unpinned..],
    ] {
        for pair in group.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_search_is_case_insensitive_substring() {
    let test_db = connect("it-search").await;

    test_db
        .db
        .notes
        .insert(
            NoteStatus::Active,
            note_request(&test_db.title("Grocery List")),
        )
        .await
        .unwrap();

    for query in ["grocery", "GROCERY", "ery lis"] {
        // generous limit: other fixtures' rows may match too
        let result = test_db
            .db
            .notes
            .list(list_request(NoteStatus::Active, query, 1, 50))
            .await
            .unwrap();
        assert!(
            result
                .notes
                .iter()
                .any(|n| n.title == test_db.title("Grocery List")),
            "search {:?} should match",
            query
        );
    }

    // Matches against label as well
    let req = CreateNoteRequest {
        title: test_db.title("untitled-ish"),
        label: Some("shopping".to_string()),
        ..Default::default()
    };
    test_db.db.notes.insert(NoteStatus::Active, req).await.unwrap();
    let by_label = test_db
        .db
        .notes
        .list(list_request(NoteStatus::Active, "SHOPPING", 1, 50))
        .await
        .unwrap();
    assert!(by_label
        .notes
        .iter()
        .any(|n| n.label.as_deref() == Some("shopping")));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_num_of_pages_is_ceiling_of_total_over_limit() {
    let test_db = connect("it-pages").await;

    for i in 0..13 {
        test_db
            .db
            .notes
            .insert(
                NoteStatus::Active,
                note_request(&test_db.title(&format!("n{}", i))),
            )
            .await
            .unwrap();
    }

    let result = test_db
        .db
        .notes
        .list(list_request(NoteStatus::Active, "it-pages", 1, 6))
        .await
        .unwrap();
    assert_eq!(result.total_notes, 13);
    assert_eq!(result.num_of_pages, 3);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_update_returns_pre_update_snapshot() {
    let test_db = connect("it-update").await;

    let req = CreateNoteRequest {
        title: test_db.title("before"),
        text: Some("unchanged text".to_string()),
        ..Default::default()
    };
    let created = test_db.db.notes.insert(NoteStatus::Active, req).await.unwrap();
    assert!(!created.pinned);

    let snapshot = test_db
        .db
        .notes
        .update(
            created.id,
            UpdateNoteRequest {
                pinned: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // The returned record is the state before the update
    assert!(!snapshot.pinned);
    assert_eq!(snapshot.title, created.title);

    // The persisted record has the change and nothing else touched
    let after = test_db
        .db
        .notes
        .fetch(created.id, NoteStatus::Active)
        .await
        .unwrap();
    assert!(after.pinned);
    assert_eq!(after.title, created.title);
    assert_eq!(after.text, created.text);
    assert!(after.updated_at > created.updated_at);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_update_missing_note_is_not_found() {
    let test_db = connect("it-update-missing").await;

    let err = test_db
        .db
        .notes
        .update(
            Uuid::new_v4(),
            UpdateNoteRequest {
                pinned: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoteNotFound(_)));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_delete_reports_whether_row_existed() {
    let test_db = connect("it-delete").await;

    let note = test_db
        .db
        .notes
        .insert(NoteStatus::Active, note_request(&test_db.title("doomed")))
        .await
        .unwrap();

    assert!(test_db
        .db
        .notes
        .delete(note.id, NoteStatus::Active)
        .await
        .unwrap());
    // Second delete: no row, no error
    assert!(!test_db
        .db
        .notes
        .delete(note.id, NoteStatus::Active)
        .await
        .unwrap());
    assert!(!test_db
        .db
        .notes
        .delete(Uuid::new_v4(), NoteStatus::Active)
        .await
        .unwrap());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_fetch_missing_note_is_not_found() {
    let test_db = connect("it-fetch-missing").await;

    let id = Uuid::new_v4();
    let err = test_db
        .db
        .notes
        .fetch(id, NoteStatus::Active)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoteNotFound(missing) if missing == id));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_trashed_titles_are_unique() {
    let test_db = connect("it-bin-unique").await;

    let title = test_db.title("duplicate");
    test_db
        .db
        .notes
        .insert(NoteStatus::Trashed, note_request(&title))
        .await
        .unwrap();

    let err = test_db
        .db
        .notes
        .insert(NoteStatus::Trashed, note_request(&title))
        .await
        .unwrap_err();
    match err {
        Error::Database(db_err) => {
            let msg = db_err.to_string();
            assert!(
                msg.contains("duplicate key") || msg.contains("unique"),
                "unexpected error: {}",
                msg
            );
        }
        other => panic!("expected database error, got: {}", other),
    }

    // Active titles are free to repeat
    test_db
        .db
        .notes
        .insert(NoteStatus::Active, note_request(&title))
        .await
        .unwrap();
    test_db
        .db
        .notes
        .insert(NoteStatus::Active, note_request(&title))
        .await
        .unwrap();

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_trash_and_restore_flip_status_only() {
    let test_db = connect("it-trash").await;

    let req = CreateNoteRequest {
        title: test_db.title("keeper"),
        text: Some("survives the round trip".to_string()),
        color: Some("#d7f8c6".to_string()),
        ..Default::default()
    };
    let note = test_db.db.notes.insert(NoteStatus::Active, req).await.unwrap();

    test_db.db.notes.trash(note.id).await.unwrap();
    assert!(test_db
        .db
        .notes
        .fetch(note.id, NoteStatus::Active)
        .await
        .is_err());
    let trashed = test_db
        .db
        .notes
        .fetch(note.id, NoteStatus::Trashed)
        .await
        .unwrap();
    assert_eq!(trashed.status, NoteStatus::Trashed);
    assert_eq!(trashed.text, note.text);

    // Trashing again is a not-found: the active row is gone
    let err = test_db.db.notes.trash(note.id).await.unwrap_err();
    assert!(matches!(err, Error::NoteNotFound(_)));

    test_db.db.notes.restore(note.id).await.unwrap();
    let restored = test_db
        .db
        .notes
        .fetch(note.id, NoteStatus::Active)
        .await
        .unwrap();
    assert_eq!(restored.title, note.title);
    assert_eq!(restored.color, note.color);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_list_scopes_by_status() {
    let test_db = connect("it-scope").await;

    test_db
        .db
        .notes
        .insert(NoteStatus::Active, note_request(&test_db.title("active")))
        .await
        .unwrap();
    test_db
        .db
        .notes
        .insert(NoteStatus::Trashed, note_request(&test_db.title("binned")))
        .await
        .unwrap();

    let active = test_db
        .db
        .notes
        .list(list_request(NoteStatus::Active, "it-scope", 1, 6))
        .await
        .unwrap();
    let trashed = test_db
        .db
        .notes
        .list(list_request(NoteStatus::Trashed, "it-scope", 1, 6))
        .await
        .unwrap();

    assert_eq!(active.total_notes, 1);
    assert!(active.notes.iter().all(|n| n.status == NoteStatus::Active));
    assert_eq!(trashed.total_notes, 1);
    assert!(trashed.notes.iter().all(|n| n.status == NoteStatus::Trashed));

    test_db.cleanup().await;
}
