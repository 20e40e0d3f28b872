//! Best-effort audit trail of mutating actions.
//!
//! Recording is fire-and-forget: entries are appended from a detached task
//! and append failures are logged and swallowed, never surfaced to the
//! operation that triggered them. Entries expire after a retention window
//! enforced by [`run_prune_worker`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::content::ContentStore;

/// The closed set of recordable actions.
///
/// An action outside this set is a programming error, not a runtime one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Register,
    Login,
    ThreadCreate,
    ThreadUpdate,
    ThreadDelete,
    CommentCreate,
    CommentUpdate,
    CommentDelete,
    Vote,
    Ban,
    Unban,
    RoleChange,
    CategoryCreate,
    CategoryUpdate,
    CategoryDelete,
}

impl ActivityAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Login => "login",
            Self::ThreadCreate => "thread_create",
            Self::ThreadUpdate => "thread_update",
            Self::ThreadDelete => "thread_delete",
            Self::CommentCreate => "comment_create",
            Self::CommentUpdate => "comment_update",
            Self::CommentDelete => "comment_delete",
            Self::Vote => "vote",
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::RoleChange => "role_change",
            Self::CategoryCreate => "category_create",
            Self::CategoryUpdate => "category_update",
            Self::CategoryDelete => "category_delete",
        }
    }
}

/// One recorded action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub actor_id: i64,
    pub action: ActivityAction,
    pub target_type: Option<String>,
    pub target_id: Option<i64>,
    pub metadata: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

impl ActivityEntry {
    /// Build an entry stamped with the current time and no request origin.
    #[must_use]
    pub fn new(actor_id: i64, action: ActivityAction) -> Self {
        Self {
            actor_id,
            action,
            target_type: None,
            target_id: None,
            metadata: serde_json::Value::Null,
            ip_address: None,
            user_agent: None,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[must_use]
    pub fn target(mut self, target_type: &str, target_id: i64) -> Self {
        self.target_type = Some(target_type.to_string());
        self.target_id = Some(target_id);
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn origin(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// Fire-and-forget recorder over the content store's activity log.
#[derive(Clone)]
pub struct ActivityRecorder {
    store: Arc<ContentStore>,
}

impl ActivityRecorder {
    #[must_use]
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }

    /// Record an entry from a detached task.
    ///
    /// The returned handle is for tests; callers drop it. Failures are logged
    /// at warn and never propagated.
    pub fn record(&self, entry: ActivityEntry) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.append_activity(&entry) {
                warn!(
                    action = entry.action.as_str(),
                    actor_id = entry.actor_id,
                    "Failed to record activity: {e}"
                );
            }
        })
    }
}

/// Run a single prune cycle.
async fn prune_once(store: &ContentStore, retention_days: i64) {
    let cutoff = (Utc::now() - chrono::Duration::days(retention_days)).to_rfc3339();
    match store.prune_activity_before(&cutoff) {
        Ok(count) => {
            if count > 0 {
                tracing::info!(
                    expired_entries = count,
                    retention_days,
                    "Pruned expired activity entries"
                );
            }
        }
        Err(e) => {
            tracing::error!("Failed to prune activity entries: {e}");
        }
    }
}

/// Run the activity retention worker.
///
/// Prunes immediately on start, then at the configured interval. Respects the
/// cancellation token for graceful shutdown.
pub async fn run_prune_worker(
    store: Arc<ContentStore>,
    retention_days: i64,
    interval: Duration,
    shutdown: CancellationToken,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        retention_days,
        "Starting activity prune worker"
    );

    prune_once(&store, retention_days).await;

    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // Skip the first immediate tick (we already pruned)

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                prune_once(&store, retention_days).await;
            }
            () = shutdown.cancelled() => {
                tracing::info!("Activity prune worker shutting down");
                break;
            }
        }
    }
}
