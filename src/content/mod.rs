//! Content store adapter: document side of the forum.
//!
//! Backed by redb, a pure-Rust embedded key-value database. Each thread owns
//! one JSON document (original post + comment sequence) keyed by its thread
//! id; the activity log lives in a second table under a monotonic sequence.
//!
//! redb's single-writer transactions are the atomic single-document update
//! primitive the vote and comment paths rely on: a toggle or append is one
//! read-modify-write commit, so concurrent writers cannot lose updates.

mod models;

pub use models::*;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use redb::{ReadableTable, TableDefinition};
use thiserror::Error;

use crate::activity::ActivityEntry;
use crate::error::{AppError, Result as AppResult};

const THREADS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("thread_docs");
const ACTIVITY_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("activity_log");

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content document {0} already exists")]
    AlreadyExists(i64),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

macro_rules! storage_from {
    ($($err:ty),+) => {
        $(
            impl From<$err> for ContentError {
                fn from(e: $err) -> Self {
                    Self::Storage(e.to_string())
                }
            }
        )+
    };
}

storage_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError
);

/// Write surface the thread creation saga needs from the content store.
///
/// A trait seam so saga tests can substitute a failing store and exercise the
/// compensation path.
pub trait ContentRepo: Send + Sync {
    /// Create the document for a new thread. Fails if one already exists.
    fn create_document(&self, doc: &ThreadDocument) -> std::result::Result<(), ContentError>;

    /// Delete a thread's document. Returns whether one existed.
    fn delete_document(&self, thread_id: i64) -> std::result::Result<bool, ContentError>;
}

pub struct ContentStore {
    db: Arc<redb::Database>,
    next_activity_id: AtomicU64,
}

impl ContentStore {
    /// Open or create the content database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or its tables created.
    pub fn open(path: &Path) -> std::result::Result<Self, ContentError> {
        let db = redb::Database::create(path)?;

        // Ensure both tables exist so later read transactions never fail on
        // a missing table.
        let txn = db.begin_write()?;
        {
            let _threads = txn.open_table(THREADS_TABLE)?;
            let _activity = txn.open_table(ACTIVITY_TABLE)?;
        }
        txn.commit()?;

        // Seed the activity sequence from the highest persisted key.
        let read_txn = db.begin_read()?;
        let activity = read_txn.open_table(ACTIVITY_TABLE)?;
        let next_id = activity.last()?.map_or(1, |(key, _)| key.value() + 1);

        Ok(Self {
            db: Arc::new(db),
            next_activity_id: AtomicU64::new(next_id),
        })
    }

    // ========== Thread documents ==========

    /// Fetch a thread's content document.
    pub fn get_document(
        &self,
        thread_id: i64,
    ) -> std::result::Result<Option<ThreadDocument>, ContentError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(THREADS_TABLE)?;

        match table.get(thread_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Run a mutation against one document inside a single write transaction.
    ///
    /// The closure sees the deserialized document and may fail with a domain
    /// error, in which case the transaction is aborted and nothing is written.
    /// This is the only way callers modify documents; there is no separate
    /// read-then-write surface to race against.
    ///
    /// # Errors
    ///
    /// `NotFound` if no document exists for the thread; `StoreUnavailable` on
    /// store failures; otherwise whatever the closure returns.
    pub fn update_document<T>(
        &self,
        thread_id: i64,
        mutate: impl FnOnce(&mut ThreadDocument) -> AppResult<T>,
    ) -> AppResult<T> {
        let txn = self.db.begin_write().map_err(unavailable)?;
        let value = {
            let mut table = txn.open_table(THREADS_TABLE).map_err(unavailable)?;

            let bytes = match table.get(thread_id).map_err(unavailable)? {
                Some(guard) => guard.value().to_vec(),
                None => return Err(AppError::not_found("thread", thread_id)),
            };

            let mut doc: ThreadDocument =
                serde_json::from_slice(&bytes).map_err(unavailable)?;
            let value = mutate(&mut doc)?;

            let encoded = serde_json::to_vec(&doc).map_err(unavailable)?;
            table
                .insert(thread_id, encoded.as_slice())
                .map_err(unavailable)?;
            value
        };
        txn.commit().map_err(unavailable)?;
        Ok(value)
    }

    // ========== Activity log ==========

    /// Append one activity log entry, returning its sequence number.
    pub fn append_activity(
        &self,
        entry: &ActivityEntry,
    ) -> std::result::Result<u64, ContentError> {
        let seq = self.next_activity_id.fetch_add(1, Ordering::SeqCst);
        let encoded = serde_json::to_vec(entry)?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ACTIVITY_TABLE)?;
            table.insert(seq, encoded.as_slice())?;
        }
        txn.commit()?;

        Ok(seq)
    }

    /// Most recent activity entries, newest first.
    pub fn recent_activity(
        &self,
        limit: usize,
    ) -> std::result::Result<Vec<ActivityEntry>, ContentError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVITY_TABLE)?;

        let mut entries = Vec::new();
        for item in table.iter()?.rev().take(limit) {
            let (_, value) = item?;
            entries.push(serde_json::from_slice(value.value())?);
        }

        Ok(entries)
    }

    /// Remove activity entries created before the cutoff (RFC 3339 timestamp).
    /// Returns how many were removed.
    pub fn prune_activity_before(&self, cutoff: &str) -> std::result::Result<u64, ContentError> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(ACTIVITY_TABLE)?;

            let mut expired = Vec::new();
            for item in table.iter()? {
                let (key, value) = item?;
                let entry: ActivityEntry = serde_json::from_slice(value.value())?;
                if entry.created_at.as_str() < cutoff {
                    expired.push(key.value());
                }
            }

            for key in &expired {
                table.remove(*key)?;
            }
            expired.len() as u64
        };
        txn.commit()?;

        Ok(removed)
    }
}

impl ContentRepo for ContentStore {
    fn create_document(&self, doc: &ThreadDocument) -> std::result::Result<(), ContentError> {
        let encoded = serde_json::to_vec(doc)?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(THREADS_TABLE)?;

            let exists = table.get(doc.thread_id)?.is_some();
            if exists {
                return Err(ContentError::AlreadyExists(doc.thread_id));
            }

            table.insert(doc.thread_id, encoded.as_slice())?;
        }
        txn.commit()?;

        Ok(())
    }

    fn delete_document(&self, thread_id: i64) -> std::result::Result<bool, ContentError> {
        let txn = self.db.begin_write()?;
        let existed;
        {
            let mut table = txn.open_table(THREADS_TABLE)?;
            // Bind before the table drops; the removed value's guard borrows it.
            existed = table.remove(thread_id)?.is_some();
        }
        txn.commit()?;

        Ok(existed)
    }
}

fn unavailable<E: std::fmt::Display>(err: E) -> AppError {
    AppError::StoreUnavailable(err.to_string())
}
