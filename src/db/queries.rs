use sqlx::{SqliteConnection, SqlitePool};

use super::models::{Category, NewThreadRow, ThreadMetadata};
use crate::error::Result;

// ========== Categories ==========

/// Create a category, returning its ID.
///
/// Fails with `Conflict` if the name is already taken.
pub async fn create_category(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO categories (name, description) VALUES (?, ?)")
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Get a category by ID.
pub async fn get_category(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let category = sqlx::query_as("SELECT * FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(category)
}

/// List all categories, active first.
pub async fn list_categories(pool: &SqlitePool) -> Result<Vec<Category>> {
    let categories = sqlx::query_as("SELECT * FROM categories ORDER BY is_active DESC, name ASC")
        .fetch_all(pool)
        .await?;

    Ok(categories)
}

/// Activate or deactivate a category. Returns whether a row was updated.
pub async fn set_category_active(pool: &SqlitePool, id: i64, active: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE categories SET is_active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// ========== Threads ==========

/// Insert a new thread row on the given connection, returning its ID.
///
/// Takes a plain connection rather than the pool so the creation saga can run
/// it inside an uncommitted transaction.
pub async fn insert_thread(conn: &mut SqliteConnection, row: &NewThreadRow) -> Result<i64> {
    let result = sqlx::query(
        r"
        INSERT INTO threads (slug, title, category_id, author_id, tags)
        VALUES (?, ?, ?, ?, ?)
        ",
    )
    .bind(&row.slug)
    .bind(&row.title)
    .bind(row.category_id)
    .bind(row.author_id)
    .bind(&row.tags)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Fetch a thread row on the given connection.
///
/// Used by the creation saga to read the just-inserted row before commit.
pub async fn get_thread_on(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<ThreadMetadata>> {
    let thread = sqlx::query_as("SELECT * FROM threads WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(thread)
}

/// Get a thread by ID.
pub async fn get_thread(pool: &SqlitePool, id: i64) -> Result<Option<ThreadMetadata>> {
    let thread = sqlx::query_as("SELECT * FROM threads WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(thread)
}

/// Get a thread by its slug.
pub async fn get_thread_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<ThreadMetadata>> {
    let thread = sqlx::query_as("SELECT * FROM threads WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(thread)
}

/// List threads in a category, pinned first, then by most recent activity.
pub async fn list_threads_in_category(
    pool: &SqlitePool,
    category_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<ThreadMetadata>> {
    let threads = sqlx::query_as(
        r"
        SELECT * FROM threads
        WHERE category_id = ?
        ORDER BY is_pinned DESC, COALESCE(last_reply_at, created_at) DESC
        LIMIT ? OFFSET ?
        ",
    )
    .bind(category_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(threads)
}

/// Update a thread's title and tags. Returns whether a row was updated.
pub async fn update_thread(
    pool: &SqlitePool,
    id: i64,
    title: &str,
    tags: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE threads SET title = ?, tags = ?, updated_at = datetime('now') WHERE id = ?",
    )
    .bind(title)
    .bind(tags)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Pin or unpin a thread. Returns whether a row was updated.
pub async fn set_thread_pinned(pool: &SqlitePool, id: i64, pinned: bool) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE threads SET is_pinned = ?, updated_at = datetime('now') WHERE id = ?",
    )
    .bind(pinned)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Lock or unlock a thread. Returns whether a row was updated.
pub async fn set_thread_locked(pool: &SqlitePool, id: i64, locked: bool) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE threads SET is_locked = ?, updated_at = datetime('now') WHERE id = ?",
    )
    .bind(locked)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Best-effort monotonic view counter bump.
pub async fn increment_view_count(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE threads SET view_count = view_count + 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete a thread row. Returns whether a row was deleted.
pub async fn delete_thread(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM threads WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// ========== Reply counters ==========

/// Atomically bump the derived reply counter and last-activity fields.
///
/// A single UPDATE, not read-modify-write, so concurrent comment creators
/// cannot lose increments.
pub async fn increment_reply_count(pool: &SqlitePool, id: i64, user_id: i64) -> Result<bool> {
    let result = sqlx::query(
        r"
        UPDATE threads
        SET reply_count = reply_count + 1,
            last_reply_at = datetime('now'),
            last_reply_by = ?
        WHERE id = ?
        ",
    )
    .bind(user_id)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Atomically decrement the derived reply counter, floored at zero.
///
/// Last-activity fields are deliberately untouched; a deleted comment does
/// not un-bump the thread.
pub async fn decrement_reply_count(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE threads SET reply_count = MAX(reply_count - 1, 0) WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
