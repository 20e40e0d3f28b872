//! Integration tests for the thread creation saga.

use std::sync::Arc;

use forumd::content::{ContentError, ContentRepo, ContentStore, ThreadDocument};
use forumd::db::{self, Database};
use forumd::error::AppError;
use forumd::forum::{run_create, Actor, ForumService, NewThread, Role};
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

async fn create_test_category(service: &ForumService, name: &str) -> i64 {
    let moderator = Actor::new(1, Role::Moderator);
    service
        .create_category(&moderator, name, None)
        .await
        .expect("Failed to create category")
}

fn new_thread(category_id: i64) -> NewThread {
    NewThread {
        title: "Hello World".to_string(),
        body: "This is the opening post of the thread.".to_string(),
        category_id,
        tags: vec!["intro".to_string()],
    }
}

/// A content store that always fails the document write, to exercise the
/// saga's compensation path.
struct FailingContent;

impl ContentRepo for FailingContent {
    fn create_document(&self, _doc: &ThreadDocument) -> Result<(), ContentError> {
        Err(ContentError::Storage("induced write failure".to_string()))
    }

    fn delete_document(&self, _thread_id: i64) -> Result<bool, ContentError> {
        Ok(false)
    }
}

#[tokio::test]
async fn test_create_thread_creates_both_artifacts() {
    let (service, _temp_dir) = setup().await;
    let category_id = create_test_category(&service, "General").await;
    let author = Actor::new(10, Role::User);

    let thread = service
        .create_thread(&author, new_thread(category_id))
        .await
        .expect("Failed to create thread");

    assert!(thread.id > 0);
    assert!(thread.slug.starts_with("hello-world-"));
    assert_eq!(thread.reply_count, 0);
    assert!(!thread.is_locked);

    // Metadata and content document ids match.
    let doc = service
        .content()
        .get_document(thread.id)
        .expect("Failed to read content store")
        .expect("Content document missing");
    assert_eq!(doc.thread_id, thread.id);
    assert_eq!(doc.original_post.author_id, 10);
    assert_eq!(
        doc.original_post.body,
        "This is the opening post of the thread."
    );
    assert!(doc.comments.is_empty());
}

#[tokio::test]
async fn test_create_thread_rejects_missing_category() {
    let (service, _temp_dir) = setup().await;
    let author = Actor::new(10, Role::User);

    let err = service
        .create_thread(&author, new_thread(9999))
        .await
        .expect_err("Expected missing category to fail");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_create_thread_rejects_inactive_category() {
    let (service, _temp_dir) = setup().await;
    let moderator = Actor::new(1, Role::Moderator);
    let category_id = create_test_category(&service, "Archive").await;
    service
        .set_category_active(&moderator, category_id, false)
        .await
        .unwrap();

    let author = Actor::new(10, Role::User);
    let err = service
        .create_thread(&author, new_thread(category_id))
        .await
        .expect_err("Expected inactive category to fail");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_induced_content_failure_leaves_no_orphan_metadata() {
    let (service, _temp_dir) = setup().await;
    let category_id = create_test_category(&service, "General").await;

    let err = run_create(
        service.db().pool(),
        &FailingContent,
        10,
        new_thread(category_id),
    )
    .await
    .expect_err("Expected induced content failure to propagate");
    assert!(matches!(err, AppError::StoreUnavailable(_)));

    // The uncommitted metadata row must have been rolled back.
    let threads = db::list_threads_in_category(service.db().pool(), category_id, 10, 0)
        .await
        .unwrap();
    assert!(threads.is_empty());
}

#[tokio::test]
async fn test_compensation_removes_orphan_document() {
    let (service, _temp_dir) = setup().await;
    let category_id = create_test_category(&service, "General").await;
    let author = Actor::new(10, Role::User);

    // Simulate the post-commit-failure state: a document with no metadata row.
    let thread = service
        .create_thread(&author, new_thread(category_id))
        .await
        .unwrap();
    db::delete_thread(service.db().pool(), thread.id)
        .await
        .unwrap();

    let removed = service
        .content()
        .delete_document(thread.id)
        .expect("Compensation delete failed");
    assert!(removed);
    assert!(service
        .content()
        .get_document(thread.id)
        .unwrap()
        .is_none());

    // Deleting again reports that nothing existed.
    assert!(!service.content().delete_document(thread.id).unwrap());
}

#[tokio::test]
async fn test_slugs_are_unique_per_thread() {
    let (service, _temp_dir) = setup().await;
    let category_id = create_test_category(&service, "General").await;
    let author = Actor::new(10, Role::User);

    let first = service
        .create_thread(&author, new_thread(category_id))
        .await
        .unwrap();
    let second = service
        .create_thread(&author, new_thread(category_id))
        .await
        .unwrap();

    assert_ne!(first.slug, second.slug);
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn test_duplicate_category_name_is_conflict() {
    let (service, _temp_dir) = setup().await;
    let moderator = Actor::new(1, Role::Moderator);
    service
        .create_category(&moderator, "General", None)
        .await
        .unwrap();

    let err = service
        .create_category(&moderator, "General", None)
        .await
        .expect_err("Expected duplicate category name to fail");
    assert!(matches!(err, AppError::Conflict(_)));
}
