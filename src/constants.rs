//! Shared constants used across the application.

/// Body text a comment is overwritten with when it is soft-deleted.
///
/// Tombstoned comments stay addressable so replies keep a valid parent; only
/// the body is replaced.
pub const DELETED_COMMENT_PLACEHOLDER: &str = "[deleted]";

/// Default retention window for activity log entries, in days.
pub const DEFAULT_ACTIVITY_RETENTION_DAYS: i64 = 90;

/// Length of the random suffix appended to thread slugs.
pub const SLUG_SUFFIX_LEN: usize = 6;
