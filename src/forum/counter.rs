//! Reply counter synchronizer.
//!
//! `reply_count` and `last_reply_at` on the thread row are a cache of the
//! content document's comment collection, kept in sync by explicit calls
//! after each comment create or soft-delete. The updates are single atomic
//! SQL statements, but they are not atomic with the comment write they
//! follow: a failure here leaves the counter stale until a later comment
//! corrects it. Callers surface that as partial success, never as failure.

use sqlx::SqlitePool;

use crate::db;
use crate::error::Result;

/// Create path: bump the reply count and last-activity fields.
///
/// Returns whether a thread row was actually updated. A miss means the row
/// is gone (deleted concurrently) and the counter was not synchronized.
pub async fn on_comment_created(pool: &SqlitePool, thread_id: i64, author_id: i64) -> Result<bool> {
    db::increment_reply_count(pool, thread_id, author_id).await
}

/// Soft-delete path: decrement the reply count, floored at zero. Last-reply
/// fields are left as they were; deletion does not un-bump the thread.
/// Returns whether a thread row was actually updated, as above.
pub async fn on_comment_deleted(pool: &SqlitePool, thread_id: i64) -> Result<bool> {
    db::decrement_reply_count(pool, thread_id).await
}
