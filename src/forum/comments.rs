//! Comment lifecycle manager.
//!
//! Enforces the locked-thread write rule, parent-existence checks, owner-or-
//! moderator gating, and soft-delete tombstoning. All comment mutations go
//! through the content store's single-document transaction; the derived
//! reply counter is synchronized afterwards, with failures reported as
//! partial success rather than rolled back.

use chrono::Utc;
use tracing::warn;

use super::{counter, Actor, ForumService};
use crate::activity::{ActivityAction, ActivityEntry};
use crate::content::Comment;
use crate::db;
use crate::error::{AppError, Result};

/// Outcome of adding a comment.
///
/// `counter_synced` is false when the comment was written but the derived
/// reply counter could not be updated; the operation succeeded with drift.
#[derive(Debug, Clone)]
pub struct CommentAdded {
    pub comment: Comment,
    pub counter_synced: bool,
}

/// Outcome of soft-deleting a comment. See [`CommentAdded::counter_synced`].
#[derive(Debug, Clone)]
pub struct CommentDeleted {
    pub comment_id: i64,
    pub counter_synced: bool,
}

impl ForumService {
    /// Append a comment to a thread, optionally as a reply.
    ///
    /// # Errors
    ///
    /// `NotFound` if the thread or the referenced parent comment is absent;
    /// `Forbidden` if the thread is locked (for every role; moderators must
    /// unlock first). Replies to tombstoned parents are allowed.
    pub async fn add_comment(
        &self,
        actor: &Actor,
        thread_id: i64,
        body: String,
        parent_comment_id: Option<i64>,
    ) -> Result<CommentAdded> {
        let metadata = db::get_thread(self.db().pool(), thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("thread", thread_id))?;

        if metadata.is_locked {
            return Err(AppError::Forbidden("thread is locked".to_string()));
        }

        let author_id = actor.id;
        let comment = self.content().update_document(thread_id, move |doc| {
            if let Some(parent_id) = parent_comment_id {
                // Tombstoned comments remain addressable as parents so the
                // thread shape survives deletions.
                if doc.find_comment(parent_id).is_none() {
                    return Err(AppError::not_found("parent comment", parent_id));
                }
            }
            Ok(doc.append_comment(author_id, body, parent_comment_id).clone())
        })?;

        let counter_synced =
            match counter::on_comment_created(self.db().pool(), thread_id, actor.id).await {
                Ok(true) => true,
                Ok(false) => {
                    warn!(thread_id, "Reply counter increment matched no thread row");
                    false
                }
                Err(e) => {
                    warn!(thread_id, "Reply counter increment failed: {e}");
                    false
                }
            };

        self.recorder().record(
            ActivityEntry::new(actor.id, ActivityAction::CommentCreate)
                .target("comment", comment.id)
                .metadata(serde_json::json!({ "thread_id": thread_id })),
        );

        Ok(CommentAdded {
            comment,
            counter_synced,
        })
    }

    /// Edit a comment's body.
    ///
    /// # Errors
    ///
    /// `NotFound` if the thread or comment is absent or already tombstoned;
    /// `Forbidden` unless the actor is the author or a moderator.
    pub async fn edit_comment(
        &self,
        actor: &Actor,
        thread_id: i64,
        comment_id: i64,
        body: String,
    ) -> Result<Comment> {
        let actor = *actor;
        let comment = self.content().update_document(thread_id, move |doc| {
            let comment = doc
                .find_comment_mut(comment_id)
                .filter(|c| !c.is_deleted)
                .ok_or_else(|| AppError::not_found("comment", comment_id))?;

            if !actor.owns_or_moderates(comment.author_id) {
                return Err(AppError::Forbidden(
                    "only the author or a moderator may edit a comment".to_string(),
                ));
            }

            let now = Utc::now().to_rfc3339();
            comment.body = body;
            comment.is_edited = true;
            comment.edited_at = Some(now.clone());
            comment.updated_at = now;
            Ok(comment.clone())
        })?;

        self.recorder().record(
            ActivityEntry::new(actor.id, ActivityAction::CommentUpdate)
                .target("comment", comment_id)
                .metadata(serde_json::json!({ "thread_id": thread_id })),
        );

        Ok(comment)
    }

    /// Tombstone a comment: placeholder body, terminal deleted state.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::edit_comment`]; a tombstoned comment cannot
    /// be deleted again.
    pub async fn soft_delete_comment(
        &self,
        actor: &Actor,
        thread_id: i64,
        comment_id: i64,
    ) -> Result<CommentDeleted> {
        let actor_copy = *actor;
        self.content().update_document(thread_id, move |doc| {
            let comment = doc
                .find_comment_mut(comment_id)
                .filter(|c| !c.is_deleted)
                .ok_or_else(|| AppError::not_found("comment", comment_id))?;

            if !actor_copy.owns_or_moderates(comment.author_id) {
                return Err(AppError::Forbidden(
                    "only the author or a moderator may delete a comment".to_string(),
                ));
            }

            comment.tombstone();
            Ok(())
        })?;

        let counter_synced = match counter::on_comment_deleted(self.db().pool(), thread_id).await {
            Ok(true) => true,
            Ok(false) => {
                warn!(thread_id, "Reply counter decrement matched no thread row");
                false
            }
            Err(e) => {
                warn!(thread_id, "Reply counter decrement failed: {e}");
                false
            }
        };

        self.recorder().record(
            ActivityEntry::new(actor.id, ActivityAction::CommentDelete)
                .target("comment", comment_id)
                .metadata(serde_json::json!({ "thread_id": thread_id })),
        );

        Ok(CommentDeleted {
            comment_id,
            counter_synced,
        })
    }

    /// Edit the thread's original post body.
    ///
    /// # Errors
    ///
    /// `NotFound` if the thread is absent; `Forbidden` unless the actor is
    /// the post's author or a moderator.
    pub async fn edit_original_post(
        &self,
        actor: &Actor,
        thread_id: i64,
        body: String,
    ) -> Result<()> {
        let actor_copy = *actor;
        self.content().update_document(thread_id, move |doc| {
            if !actor_copy.owns_or_moderates(doc.original_post.author_id) {
                return Err(AppError::Forbidden(
                    "only the author or a moderator may edit the post".to_string(),
                ));
            }

            doc.original_post.body = body;
            doc.original_post.is_edited = true;
            doc.original_post.edited_at = Some(Utc::now().to_rfc3339());
            Ok(())
        })?;

        self.recorder().record(
            ActivityEntry::new(actor.id, ActivityAction::ThreadUpdate).target("thread", thread_id),
        );

        Ok(())
    }
}
