//! forumd library.
//!
//! A discussion thread service that splits each thread across two storage
//! engines: relational metadata (title, category, derived counters,
//! moderation flags) in SQLite, and the content document (original post plus
//! the nested comment collection) in an embedded document store. The forum
//! core keeps the two consistent without a cross-store transaction: a
//! creation saga with compensation, explicit reply-counter synchronization,
//! soft-delete tombstoning, and idempotent vote toggling.

pub mod activity;
pub mod config;
pub mod constants;
pub mod content;
pub mod db;
pub mod error;
pub mod forum;
