use serde::{Deserialize, Serialize};

/// Thread metadata row.
///
/// `reply_count` and `last_reply_at` are derived, eventually consistent state.
/// They are never ground truth for counting comments; the paired content
/// document's comment collection is.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ThreadMetadata {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub category_id: i64,
    pub author_id: i64,
    /// JSON-encoded array of tag strings.
    pub tags: Option<String>,
    pub is_pinned: bool,
    pub is_locked: bool,
    pub view_count: i64,
    pub reply_count: i64,
    pub last_reply_at: Option<String>,
    pub last_reply_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// A discussion category.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

/// Fields for inserting a new thread row.
#[derive(Debug, Clone)]
pub struct NewThreadRow {
    pub slug: String,
    pub title: String,
    pub category_id: i64,
    pub author_id: i64,
    pub tags: Option<String>,
}
