//! The forum core: thread creation saga, comment lifecycle, vote toggling,
//! and the derived reply counter that ties the two stores together.
//!
//! Mutations go through [`ForumService`], which calls both store adapters in
//! a defined order and emits activity events asynchronously. Reads bypass the
//! saga and query the stores independently, composing the response.

mod comments;
mod counter;
mod saga;
mod threads;
mod votes;

pub use comments::{CommentAdded, CommentDeleted};
pub use saga::{run_create, NewThread};
pub use votes::{VoteState, VoteTarget};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::activity::ActivityRecorder;
use crate::content::{ContentStore, ThreadDocument};
use crate::db::{self, Database, ThreadMetadata};
use crate::error::{AppError, Result};

/// Capability level supplied by the identity layer for every mutating call.
///
/// The core trusts this input; it applies only the owner/moderator checks the
/// comment lifecycle needs and never re-validates a role hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    /// Whether this role carries moderation capability.
    #[must_use]
    pub fn is_moderator(self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }
}

/// The acting identity behind a mutating call.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    /// Whether this actor owns the given author id or can moderate past it.
    #[must_use]
    pub fn owns_or_moderates(&self, author_id: i64) -> bool {
        self.id == author_id || self.role.is_moderator()
    }
}

/// A composed thread read: metadata row plus its content document.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadView {
    pub metadata: ThreadMetadata,
    pub content: ThreadDocument,
}

/// The forum service: both store adapters plus the activity recorder.
pub struct ForumService {
    db: Database,
    content: Arc<ContentStore>,
    recorder: ActivityRecorder,
}

impl ForumService {
    #[must_use]
    pub fn new(db: Database, content: Arc<ContentStore>) -> Self {
        let recorder = ActivityRecorder::new(Arc::clone(&content));
        Self {
            db,
            content,
            recorder,
        }
    }

    #[must_use]
    pub const fn db(&self) -> &Database {
        &self.db
    }

    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    #[must_use]
    pub const fn recorder(&self) -> &ActivityRecorder {
        &self.recorder
    }

    /// Read a thread by id: metadata and content fetched independently.
    ///
    /// The view counter bump is best-effort and never fails the read.
    ///
    /// # Errors
    ///
    /// `NotFound` if the metadata row is absent, or if the content document
    /// is missing (possible only in the narrow window between a failed saga
    /// commit and its compensation).
    pub async fn get_thread(&self, thread_id: i64) -> Result<ThreadView> {
        let metadata = db::get_thread(self.db.pool(), thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("thread", thread_id))?;

        self.compose_view(metadata).await
    }

    /// Read a thread by its slug. See [`Self::get_thread`].
    pub async fn get_thread_by_slug(&self, slug: &str) -> Result<ThreadView> {
        let metadata = db::get_thread_by_slug(self.db.pool(), slug)
            .await?
            .ok_or_else(|| AppError::not_found("thread", slug))?;

        self.compose_view(metadata).await
    }

    /// Most recent activity entries, newest first. Moderator-only.
    ///
    /// # Errors
    ///
    /// `Forbidden` without moderator capability; `StoreUnavailable` if the
    /// activity log cannot be read.
    pub fn recent_activity(
        &self,
        actor: &Actor,
        limit: usize,
    ) -> Result<Vec<crate::activity::ActivityEntry>> {
        if !actor.role.is_moderator() {
            return Err(AppError::Forbidden(
                "moderator capability required".to_string(),
            ));
        }
        Ok(self.content.recent_activity(limit)?)
    }

    async fn compose_view(&self, metadata: ThreadMetadata) -> Result<ThreadView> {
        let thread_id = metadata.id;
        let content = self
            .content
            .get_document(thread_id)?
            .ok_or_else(|| AppError::not_found("thread", thread_id))?;

        if let Err(e) = db::increment_view_count(self.db.pool(), thread_id).await {
            warn!(thread_id, "Failed to bump view count: {e}");
        }

        Ok(ThreadView { metadata, content })
    }
}
