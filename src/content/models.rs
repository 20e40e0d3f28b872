use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::constants::DELETED_COMMENT_PLACEHOLDER;

/// The content document paired with a thread metadata row.
///
/// One document per thread: the original post plus the full comment sequence.
/// Comments are append-only in position; deletion tombstones them in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadDocument {
    pub thread_id: i64,
    pub original_post: OriginalPost,
    pub comments: Vec<Comment>,
    /// Document-scoped comment id allocator. Ids are never reused.
    pub next_comment_id: i64,
}

/// The thread's opening post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginalPost {
    pub author_id: i64,
    pub body: String,
    pub is_edited: bool,
    pub edited_at: Option<String>,
    pub upvotes: i64,
    pub upvoted_by: Vec<i64>,
}

/// A comment embedded in a thread document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub author_id: i64,
    pub body: String,
    /// `None` means top-level. Validated against the document at creation;
    /// tombstoned parents remain valid targets.
    pub parent_comment_id: Option<i64>,
    pub is_edited: bool,
    pub edited_at: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<String>,
    pub upvotes: i64,
    pub upvoted_by: Vec<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl ThreadDocument {
    /// Build the initial document for a freshly created thread.
    #[must_use]
    pub fn new(thread_id: i64, author_id: i64, body: String) -> Self {
        Self {
            thread_id,
            original_post: OriginalPost {
                author_id,
                body,
                is_edited: false,
                edited_at: None,
                upvotes: 0,
                upvoted_by: Vec::new(),
            },
            comments: Vec::new(),
            next_comment_id: 1,
        }
    }

    #[must_use]
    pub fn find_comment(&self, id: i64) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    pub fn find_comment_mut(&mut self, id: i64) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == id)
    }

    /// Append a new comment, allocating its document-scoped id.
    ///
    /// Parent existence must be checked by the caller; this only records it.
    pub fn append_comment(
        &mut self,
        author_id: i64,
        body: String,
        parent_comment_id: Option<i64>,
    ) -> &Comment {
        let now = Utc::now().to_rfc3339();
        let comment = Comment {
            id: self.next_comment_id,
            author_id,
            body,
            parent_comment_id,
            is_edited: false,
            edited_at: None,
            is_deleted: false,
            deleted_at: None,
            upvotes: 0,
            upvoted_by: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.next_comment_id += 1;
        self.comments.push(comment);
        self.comments.last().expect("comment just pushed")
    }

    /// Number of non-deleted comments; what `reply_count` converges to.
    #[must_use]
    pub fn live_comment_count(&self) -> usize {
        self.comments.iter().filter(|c| !c.is_deleted).count()
    }
}

impl OriginalPost {
    /// Flip the voter's membership in the upvote set.
    ///
    /// Returns whether the voter is present after the toggle. The count is
    /// recomputed from the set so the two can never diverge.
    pub fn toggle_upvote(&mut self, voter_id: i64) -> bool {
        let voted = toggle_member(&mut self.upvoted_by, voter_id);
        self.upvotes = self.upvoted_by.len() as i64;
        voted
    }
}

impl Comment {
    /// Flip the voter's membership in the upvote set. See [`OriginalPost::toggle_upvote`].
    pub fn toggle_upvote(&mut self, voter_id: i64) -> bool {
        let voted = toggle_member(&mut self.upvoted_by, voter_id);
        self.upvotes = self.upvoted_by.len() as i64;
        voted
    }

    /// Tombstone this comment: fixed placeholder body, terminal deleted state.
    ///
    /// The comment stays in place so child replies keep a valid parent.
    pub fn tombstone(&mut self) {
        let now = Utc::now().to_rfc3339();
        self.body = DELETED_COMMENT_PLACEHOLDER.to_string();
        self.is_deleted = true;
        self.deleted_at = Some(now.clone());
        self.updated_at = now;
    }
}

fn toggle_member(members: &mut Vec<i64>, id: i64) -> bool {
    if let Some(pos) = members.iter().position(|&m| m == id) {
        members.remove(pos);
        false
    } else {
        members.push(id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_ids_are_not_reused() {
        let mut doc = ThreadDocument::new(1, 10, "op".to_string());
        let first = doc.append_comment(11, "a".to_string(), None).id;
        doc.find_comment_mut(first).unwrap().tombstone();
        let second = doc.append_comment(12, "b".to_string(), None).id;
        assert_ne!(first, second);
        assert_eq!(doc.live_comment_count(), 1);
    }

    #[test]
    fn test_toggle_upvote_keeps_count_and_set_in_lockstep() {
        let mut post = OriginalPost {
            author_id: 1,
            body: "op".to_string(),
            is_edited: false,
            edited_at: None,
            upvotes: 0,
            upvoted_by: Vec::new(),
        };

        assert!(post.toggle_upvote(42));
        assert_eq!(post.upvotes, post.upvoted_by.len() as i64);
        assert!(!post.toggle_upvote(42));
        assert_eq!(post.upvotes, 0);
        assert!(post.upvoted_by.is_empty());
    }

    #[test]
    fn test_tombstone_replaces_body() {
        let mut doc = ThreadDocument::new(1, 10, "op".to_string());
        let id = doc.append_comment(11, "hot take".to_string(), None).id;
        doc.find_comment_mut(id).unwrap().tombstone();

        let comment = doc.find_comment(id).unwrap();
        assert!(comment.is_deleted);
        assert_eq!(comment.body, DELETED_COMMENT_PLACEHOLDER);
        assert!(comment.deleted_at.is_some());
    }
}
