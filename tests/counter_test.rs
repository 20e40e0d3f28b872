//! Integration tests for the derived reply counter.

use std::sync::Arc;

use forumd::content::ContentStore;
use forumd::db::{self, Database};
use forumd::forum::{Actor, ForumService, NewThread, Role};
use tempfile::TempDir;

async fn setup() -> (ForumService, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = Database::new(&temp_dir.path().join("meta.sqlite"))
        .await
        .expect("Failed to create database");
    let content = Arc::new(
        ContentStore::open(&temp_dir.path().join("content.redb"))
            .expect("Failed to open content store"),
    );
    (ForumService::new(db, content), temp_dir)
}

async fn create_test_thread(service: &ForumService, author: &Actor) -> i64 {
    let moderator = Actor::new(1, Role::Moderator);
    let category_id = service
        .create_category(&moderator, "General", None)
        .await
        .unwrap();
    service
        .create_thread(
            author,
            NewThread {
                title: "Counting replies".to_string(),
                body: "A thread for counting comments.".to_string(),
                category_id,
                tags: Vec::new(),
            },
        )
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_reply_count_tracks_adds_and_deletes() {
    let (service, _temp_dir) = setup().await;
    let author = Actor::new(10, Role::User);
    let thread_id = create_test_thread(&service, &author).await;

    // N = 4 comments.
    let mut comment_ids = Vec::new();
    for i in 0..4 {
        let added = service
            .add_comment(&author, thread_id, format!("comment {i}"), None)
            .await
            .unwrap();
        assert!(added.counter_synced);
        comment_ids.push(added.comment.id);
    }

    // M = 2 deletions.
    for id in &comment_ids[..2] {
        service
            .soft_delete_comment(&author, thread_id, *id)
            .await
            .unwrap();
    }

    let metadata = db::get_thread(service.db().pool(), thread_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(metadata.reply_count, 2);

    // The counter converged to the document's live comment count.
    let doc = service.content().get_document(thread_id).unwrap().unwrap();
    assert_eq!(doc.live_comment_count() as i64, metadata.reply_count);
}

#[tokio::test]
async fn test_reply_count_never_goes_negative() {
    let (service, _temp_dir) = setup().await;
    let author = Actor::new(10, Role::User);
    let thread_id = create_test_thread(&service, &author).await;

    // Drive the decrement directly past zero; the floor holds.
    for _ in 0..3 {
        db::decrement_reply_count(service.db().pool(), thread_id)
            .await
            .unwrap();
    }

    let metadata = db::get_thread(service.db().pool(), thread_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(metadata.reply_count, 0);
}

#[tokio::test]
async fn test_delete_does_not_unbump_last_reply() {
    let (service, _temp_dir) = setup().await;
    let author = Actor::new(10, Role::User);
    let commenter = Actor::new(11, Role::User);
    let thread_id = create_test_thread(&service, &author).await;

    let comment_id = service
        .add_comment(&commenter, thread_id, "Bump".to_string(), None)
        .await
        .unwrap()
        .comment
        .id;

    let before = db::get_thread(service.db().pool(), thread_id)
        .await
        .unwrap()
        .unwrap();
    assert!(before.last_reply_at.is_some());

    service
        .soft_delete_comment(&commenter, thread_id, comment_id)
        .await
        .unwrap();

    let after = db::get_thread(service.db().pool(), thread_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.last_reply_at, before.last_reply_at);
    assert_eq!(after.last_reply_by, before.last_reply_by);
    assert_eq!(after.reply_count, 0);
}

#[tokio::test]
async fn test_counter_update_on_missing_thread_reports_miss() {
    let (service, _temp_dir) = setup().await;

    // No row 9999: both single-statement updates run but match nothing.
    assert!(!db::increment_reply_count(service.db().pool(), 9999, 1)
        .await
        .unwrap());
    assert!(!db::decrement_reply_count(service.db().pool(), 9999)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_comment_delete_reports_unsynced_when_thread_row_is_gone() {
    let (service, _temp_dir) = setup().await;
    let author = Actor::new(10, Role::User);
    let thread_id = create_test_thread(&service, &author).await;

    let comment_id = service
        .add_comment(&author, thread_id, "Orphaned soon".to_string(), None)
        .await
        .unwrap()
        .comment
        .id;

    // Remove the metadata row out from under the content document, the state
    // a concurrent thread delete leaves mid-operation.
    db::delete_thread(service.db().pool(), thread_id)
        .await
        .unwrap();

    let deleted = service
        .soft_delete_comment(&author, thread_id, comment_id)
        .await
        .expect("Tombstone should still land in the document");
    assert!(!deleted.counter_synced);

    let doc = service.content().get_document(thread_id).unwrap().unwrap();
    assert!(doc.find_comment(comment_id).unwrap().is_deleted);
}

#[tokio::test]
async fn test_increment_sets_last_reply_fields() {
    let (service, _temp_dir) = setup().await;
    let author = Actor::new(10, Role::User);
    let thread_id = create_test_thread(&service, &author).await;

    db::increment_reply_count(service.db().pool(), thread_id, 77)
        .await
        .unwrap();

    let metadata = db::get_thread(service.db().pool(), thread_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(metadata.reply_count, 1);
    assert_eq!(metadata.last_reply_by, Some(77));
    assert!(metadata.last_reply_at.is_some());
}
