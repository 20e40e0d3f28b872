//! Vote toggle engine.
//!
//! One idempotent operation flips a voter's membership in the upvote set and
//! the denormalized count in lockstep, inside a single document transaction.
//! There is no separate unvote; calling again reverses the toggle.

use super::{Actor, ForumService};
use crate::activity::{ActivityAction, ActivityEntry};
use crate::error::{AppError, Result};

/// What the vote lands on within a thread's document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    /// The thread's original post.
    Post,
    /// A comment, by document-scoped id.
    Comment(i64),
}

/// State after a toggle, as seen by the voter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteState {
    pub upvotes: i64,
    pub voted: bool,
}

impl ForumService {
    /// Toggle the actor's upvote on a post or comment.
    ///
    /// # Errors
    ///
    /// `NotFound` if the thread or comment is absent, or the comment is
    /// tombstoned.
    pub fn toggle_upvote(
        &self,
        actor: &Actor,
        thread_id: i64,
        target: VoteTarget,
    ) -> Result<VoteState> {
        let voter_id = actor.id;
        let state = self.content().update_document(thread_id, move |doc| {
            let (voted, upvotes) = match target {
                VoteTarget::Post => {
                    let voted = doc.original_post.toggle_upvote(voter_id);
                    (voted, doc.original_post.upvotes)
                }
                VoteTarget::Comment(comment_id) => {
                    let comment = doc
                        .find_comment_mut(comment_id)
                        .filter(|c| !c.is_deleted)
                        .ok_or_else(|| AppError::not_found("comment", comment_id))?;
                    let voted = comment.toggle_upvote(voter_id);
                    (voted, comment.upvotes)
                }
            };
            Ok(VoteState { upvotes, voted })
        })?;

        let (target_type, target_id) = match target {
            VoteTarget::Post => ("thread", thread_id),
            VoteTarget::Comment(id) => ("comment", id),
        };
        self.recorder().record(
            ActivityEntry::new(actor.id, ActivityAction::Vote)
                .target(target_type, target_id)
                .metadata(serde_json::json!({
                    "thread_id": thread_id,
                    "voted": state.voted,
                })),
        );

        Ok(state)
    }
}
