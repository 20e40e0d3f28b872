//! Integration tests for thread moderation: pinning, updates, cascading
//! delete, and the moderator-only activity view.

use std::sync::Arc;

use forumd::content::ContentStore;
use forumd::db::{self, Database};
use forumd::error::AppError;
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

async fn create_named_thread(
    service: &ForumService,
    author: &Actor,
    category_id: i64,
    title: &str,
) -> i64 {
    service
        .create_thread(
            author,
            NewThread {
                title: title.to_string(),
                body: format!("Opening post of {title}."),
                category_id,
                tags: Vec::new(),
            },
        )
        .await
        .expect("Failed to create thread")
        .id
}

#[tokio::test]
async fn test_pinned_threads_list_first() {
    let (service, _temp_dir) = setup().await;
    let moderator = Actor::new(1, Role::Moderator);
    let author = Actor::new(10, Role::User);
    let category_id = service
        .create_category(&moderator, "General", None)
        .await
        .unwrap();

    let first = create_named_thread(&service, &author, category_id, "First").await;
    let second = create_named_thread(&service, &author, category_id, "Second").await;

    // Bump the first thread's activity so it would otherwise list on top.
    service
        .add_comment(&author, first, "bump".to_string(), None)
        .await
        .unwrap();

    service
        .set_thread_pinned(&moderator, second, true)
        .await
        .unwrap();

    let listed = service.list_threads(category_id, 10, 0).await.unwrap();
    assert_eq!(listed[0].id, second);
    assert!(listed[0].is_pinned);
    assert_eq!(listed[1].id, first);
}

#[tokio::test]
async fn test_pin_requires_moderator() {
    let (service, _temp_dir) = setup().await;
    let moderator = Actor::new(1, Role::Moderator);
    let author = Actor::new(10, Role::User);
    let category_id = service
        .create_category(&moderator, "General", None)
        .await
        .unwrap();
    let thread_id = create_named_thread(&service, &author, category_id, "Pin me").await;

    let err = service
        .set_thread_pinned(&author, thread_id, true)
        .await
        .expect_err("Plain user pin must fail");
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_update_thread_title_and_tags() {
    let (service, _temp_dir) = setup().await;
    let moderator = Actor::new(1, Role::Moderator);
    let author = Actor::new(10, Role::User);
    let category_id = service
        .create_category(&moderator, "General", None)
        .await
        .unwrap();
    let thread_id = create_named_thread(&service, &author, category_id, "Old title").await;

    let stranger = Actor::new(11, Role::User);
    let err = service
        .update_thread(&stranger, thread_id, "Hijacked", &[])
        .await
        .expect_err("Non-owner update must fail");
    assert!(matches!(err, AppError::Forbidden(_)));

    service
        .update_thread(&author, thread_id, "New title", &["rust".to_string()])
        .await
        .unwrap();

    let view = service.get_thread(thread_id).await.unwrap();
    assert_eq!(view.metadata.title, "New title");
    let tags: Vec<String> =
        serde_json::from_str(view.metadata.tags.as_deref().unwrap()).unwrap();
    assert_eq!(tags, vec!["rust".to_string()]);

    // An update that matches no row reports the miss rather than success.
    assert!(!db::update_thread(service.db().pool(), 9999, "Nobody home", None)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_get_thread_by_slug() {
    let (service, _temp_dir) = setup().await;
    let moderator = Actor::new(1, Role::Moderator);
    let author = Actor::new(10, Role::User);
    let category_id = service
        .create_category(&moderator, "General", None)
        .await
        .unwrap();

    let thread = service
        .create_thread(
            &author,
            NewThread {
                title: "Slug addressed".to_string(),
                body: "Find me by slug.".to_string(),
                category_id,
                tags: Vec::new(),
            },
        )
        .await
        .unwrap();

    let view = service.get_thread_by_slug(&thread.slug).await.unwrap();
    assert_eq!(view.metadata.id, thread.id);
    assert_eq!(view.content.thread_id, thread.id);

    let err = service
        .get_thread_by_slug("no-such-slug-abc123")
        .await
        .expect_err("Unknown slug must fail");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_thread_removes_both_artifacts() {
    let (service, _temp_dir) = setup().await;
    let moderator = Actor::new(1, Role::Moderator);
    let author = Actor::new(10, Role::User);
    let category_id = service
        .create_category(&moderator, "General", None)
        .await
        .unwrap();
    let thread_id = create_named_thread(&service, &author, category_id, "Doomed").await;

    let stranger = Actor::new(11, Role::User);
    let err = service
        .delete_thread(&stranger, thread_id)
        .await
        .expect_err("Non-owner delete must fail");
    assert!(matches!(err, AppError::Forbidden(_)));

    service.delete_thread(&author, thread_id).await.unwrap();

    let err = service
        .get_thread(thread_id)
        .await
        .expect_err("Deleted thread must be gone");
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(service.content().get_document(thread_id).unwrap().is_none());
}

#[tokio::test]
async fn test_recent_activity_is_moderator_only() {
    let (service, _temp_dir) = setup().await;
    let moderator = Actor::new(1, Role::Moderator);
    let author = Actor::new(10, Role::User);

    let err = service
        .recent_activity(&author, 10)
        .expect_err("Plain user activity read must fail");
    assert!(matches!(err, AppError::Forbidden(_)));

    // Recording is detached; await the handle so the read has something
    // deterministic to find.
    service
        .recorder()
        .record(forumd::activity::ActivityEntry::new(
            author.id,
            forumd::activity::ActivityAction::Login,
        ))
        .await
        .unwrap();

    let entries = service.recent_activity(&moderator, 50).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].actor_id, author.id);
}
