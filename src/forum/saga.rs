//! Thread creation saga.
//!
//! A new thread is one metadata row in SQLite plus one content document in
//! the document store, and there is no transaction spanning both engines.
//! The saga orders the writes so every failure leaves at most one artifact,
//! and compensates to remove it: metadata is inserted inside an uncommitted
//! relational transaction, the document is written second, and the
//! transaction only commits once the document exists. A content failure
//! rolls the transaction back; a commit failure deletes the document.
//!
//! The one uncovered window: if the commit succeeds at the engine but the
//! acknowledgement is lost, compensation deletes a document a concurrent
//! reader may briefly have observed alongside committed metadata. Accepted;
//! there is no two-phase commit across heterogeneous stores.

use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::SqlitePool;
use tracing::warn;

use super::{Actor, ForumService};
use crate::activity::{ActivityAction, ActivityEntry};
use crate::constants::SLUG_SUFFIX_LEN;
use crate::content::{ContentRepo, ThreadDocument};
use crate::db::{self, NewThreadRow, ThreadMetadata};
use crate::error::{AppError, Result};

/// Input for thread creation. Shape validation happens upstream.
#[derive(Debug, Clone)]
pub struct NewThread {
    pub title: String,
    pub body: String,
    pub category_id: i64,
    pub tags: Vec<String>,
}

impl ForumService {
    /// Create a thread: metadata row and content document, or neither.
    ///
    /// # Errors
    ///
    /// `NotFound` if the category is absent or inactive; `Conflict` on a slug
    /// collision; `StoreUnavailable` if either store fails (after
    /// compensation has removed any partial artifact).
    pub async fn create_thread(&self, actor: &Actor, req: NewThread) -> Result<ThreadMetadata> {
        let thread = run_create(self.db().pool(), self.content(), actor.id, req).await?;

        self.recorder().record(
            ActivityEntry::new(actor.id, ActivityAction::ThreadCreate)
                .target("thread", thread.id)
                .metadata(serde_json::json!({ "slug": thread.slug })),
        );

        Ok(thread)
    }
}

/// The saga itself, parameterized over the content store so tests can induce
/// document-write failures.
pub async fn run_create(
    pool: &SqlitePool,
    content: &dyn ContentRepo,
    author_id: i64,
    req: NewThread,
) -> Result<ThreadMetadata> {
    // Precondition: the category must exist and be active, checked before
    // any write.
    let category = db::get_category(pool, req.category_id)
        .await?
        .ok_or_else(|| AppError::not_found("category", req.category_id))?;
    if !category.is_active {
        return Err(AppError::not_found("category", req.category_id));
    }

    let slug = slug_for(&req.title);
    let tags = if req.tags.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&req.tags).map_err(|e| AppError::Validation(e.to_string()))?)
    };

    // Step 1-2: insert the metadata row inside an uncommitted transaction.
    let mut tx = pool.begin().await.map_err(AppError::from)?;

    let row = NewThreadRow {
        slug,
        title: req.title,
        category_id: req.category_id,
        author_id,
        tags,
    };
    let thread_id = db::insert_thread(tx.as_mut(), &row).await?;
    let thread = db::get_thread_on(tx.as_mut(), thread_id)
        .await?
        .ok_or_else(|| {
            AppError::StoreUnavailable(format!("thread row {thread_id} missing after insert"))
        })?;

    // Step 3: write the content document. This is a separate system; the
    // relational transaction does not protect it.
    let doc = ThreadDocument::new(thread_id, author_id, req.body);
    if let Err(create_err) = content.create_document(&doc) {
        // Step 4: compensate. Undo the uncommitted row, then clear any
        // partially created document, and propagate the original error.
        if let Err(rollback_err) = tx.rollback().await {
            warn!(thread_id, "Saga rollback failed: {rollback_err}");
        }
        compensate_document(content, thread_id);
        return Err(create_err.into());
    }

    // Step 5: both artifacts exist; commit the metadata.
    if let Err(commit_err) = tx.commit().await {
        // Step 6: the relational side self-rolled-back; remove the document
        // so neither artifact survives.
        compensate_document(content, thread_id);
        return Err(commit_err.into());
    }

    Ok(thread)
}

/// Best-effort document removal on a failed saga. Errors are logged only; the
/// original failure is what propagates.
fn compensate_document(content: &dyn ContentRepo, thread_id: i64) {
    match content.delete_document(thread_id) {
        Ok(true) => warn!(thread_id, "Saga compensation removed orphan content document"),
        Ok(false) => {}
        Err(e) => warn!(
            thread_id,
            "Saga compensation failed to remove content document: {e}"
        ),
    }
}

/// Derive a unique slug: slugified title plus a short random suffix, avoiding
/// a uniqueness pre-check round trip.
fn slug_for(title: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_SUFFIX_LEN)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();

    format!("{}-{suffix}", slugify(title))
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_dash = true; // suppress a leading dash

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
        if slug.len() >= 80 {
            break;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        slug.push_str("thread");
    }
    slug
}
