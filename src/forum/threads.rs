//! Thread moderation and category management.
//!
//! Pin/lock toggles, cascading delete, listings, and the category registry
//! the creation saga checks against.

use tracing::warn;

use super::{Actor, ForumService};
use crate::activity::{ActivityAction, ActivityEntry};
use crate::content::ContentRepo;
use crate::db::{self, Category, ThreadMetadata};
use crate::error::{AppError, Result};

impl ForumService {
    /// Pin or unpin a thread. Moderator-only.
    pub async fn set_thread_pinned(
        &self,
        actor: &Actor,
        thread_id: i64,
        pinned: bool,
    ) -> Result<()> {
        require_moderator(actor)?;

        let updated = db::set_thread_pinned(self.db().pool(), thread_id, pinned).await?;
        if !updated {
            return Err(AppError::not_found("thread", thread_id));
        }

        self.recorder().record(
            ActivityEntry::new(actor.id, ActivityAction::ThreadUpdate)
                .target("thread", thread_id)
                .metadata(serde_json::json!({ "pinned": pinned })),
        );

        Ok(())
    }

    /// Lock or unlock a thread. Moderator-only. While locked, no role can
    /// add comments.
    pub async fn set_thread_locked(
        &self,
        actor: &Actor,
        thread_id: i64,
        locked: bool,
    ) -> Result<()> {
        require_moderator(actor)?;

        let updated = db::set_thread_locked(self.db().pool(), thread_id, locked).await?;
        if !updated {
            return Err(AppError::not_found("thread", thread_id));
        }

        self.recorder().record(
            ActivityEntry::new(actor.id, ActivityAction::ThreadUpdate)
                .target("thread", thread_id)
                .metadata(serde_json::json!({ "locked": locked })),
        );

        Ok(())
    }

    /// Update a thread's title and tags.
    ///
    /// # Errors
    ///
    /// `NotFound` if the thread is absent; `Forbidden` unless the actor owns
    /// the thread or moderates.
    pub async fn update_thread(
        &self,
        actor: &Actor,
        thread_id: i64,
        title: &str,
        tags: &[String],
    ) -> Result<()> {
        let metadata = db::get_thread(self.db().pool(), thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("thread", thread_id))?;

        if !actor.owns_or_moderates(metadata.author_id) {
            return Err(AppError::Forbidden(
                "only the author or a moderator may update a thread".to_string(),
            ));
        }

        let tags = if tags.is_empty() {
            None
        } else {
            Some(serde_json::to_string(tags).map_err(|e| AppError::Validation(e.to_string()))?)
        };
        let updated = db::update_thread(self.db().pool(), thread_id, title, tags.as_deref()).await?;
        if !updated {
            return Err(AppError::not_found("thread", thread_id));
        }

        self.recorder().record(
            ActivityEntry::new(actor.id, ActivityAction::ThreadUpdate)
                .target("thread", thread_id)
                .metadata(serde_json::json!({ "title": title })),
        );

        Ok(())
    }

    /// Delete a thread and its content document together.
    ///
    /// Best-effort cascade, not saga-protected: the row goes first, and a
    /// failed document delete leaves an unreachable document rather than a
    /// visible half-thread.
    ///
    /// # Errors
    ///
    /// `NotFound` if the thread is absent; `Forbidden` unless the actor owns
    /// the thread or moderates.
    pub async fn delete_thread(&self, actor: &Actor, thread_id: i64) -> Result<()> {
        let metadata = db::get_thread(self.db().pool(), thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("thread", thread_id))?;

        if !actor.owns_or_moderates(metadata.author_id) {
            return Err(AppError::Forbidden(
                "only the author or a moderator may delete a thread".to_string(),
            ));
        }

        db::delete_thread(self.db().pool(), thread_id).await?;

        if let Err(e) = self.content().delete_document(thread_id) {
            warn!(thread_id, "Cascade delete left orphan content document: {e}");
        }

        self.recorder().record(
            ActivityEntry::new(actor.id, ActivityAction::ThreadDelete)
                .target("thread", thread_id)
                .metadata(serde_json::json!({ "slug": metadata.slug })),
        );

        Ok(())
    }

    /// List threads in a category, pinned first, then by last activity.
    pub async fn list_threads(
        &self,
        category_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ThreadMetadata>> {
        db::list_threads_in_category(self.db().pool(), category_id, limit, offset).await
    }

    // ========== Categories ==========

    /// Create a category. Moderator-only; `Conflict` on a duplicate name.
    pub async fn create_category(
        &self,
        actor: &Actor,
        name: &str,
        description: Option<&str>,
    ) -> Result<i64> {
        require_moderator(actor)?;

        let id = db::create_category(self.db().pool(), name, description).await?;

        self.recorder().record(
            ActivityEntry::new(actor.id, ActivityAction::CategoryCreate)
                .target("category", id)
                .metadata(serde_json::json!({ "name": name })),
        );

        Ok(id)
    }

    /// List all categories.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        db::list_categories(self.db().pool()).await
    }

    /// Activate or deactivate a category. Moderator-only. Inactive categories
    /// reject new threads at the saga precondition.
    pub async fn set_category_active(
        &self,
        actor: &Actor,
        category_id: i64,
        active: bool,
    ) -> Result<()> {
        require_moderator(actor)?;

        let updated = db::set_category_active(self.db().pool(), category_id, active).await?;
        if !updated {
            return Err(AppError::not_found("category", category_id));
        }

        self.recorder().record(
            ActivityEntry::new(actor.id, ActivityAction::CategoryUpdate)
                .target("category", category_id)
                .metadata(serde_json::json!({ "active": active })),
        );

        Ok(())
    }
}

fn require_moderator(actor: &Actor) -> Result<()> {
    if actor.role.is_moderator() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "moderator capability required".to_string(),
        ))
    }
}
