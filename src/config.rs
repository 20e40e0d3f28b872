use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::DEFAULT_ACTIVITY_RETENTION_DAYS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Metadata store (SQLite)
    pub metadata_db_path: PathBuf,

    // Content store (redb)
    pub content_db_path: PathBuf,

    // Activity log retention
    pub activity_retention_days: i64,
    pub activity_prune_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            metadata_db_path: PathBuf::from(env_or_default(
                "METADATA_DB_PATH",
                "./data/forum-meta.sqlite",
            )),
            content_db_path: PathBuf::from(env_or_default(
                "CONTENT_DB_PATH",
                "./data/forum-content.redb",
            )),
            activity_retention_days: parse_env_i64(
                "ACTIVITY_RETENTION_DAYS",
                DEFAULT_ACTIVITY_RETENTION_DAYS,
            )?,
            activity_prune_interval: Duration::from_secs(parse_env_u64(
                "ACTIVITY_PRUNE_INTERVAL_SECS",
                3600,
            )?),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.activity_retention_days < 1 {
            return Err(ConfigError::InvalidValue {
                name: "ACTIVITY_RETENTION_DAYS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.metadata_db_path == self.content_db_path {
            return Err(ConfigError::InvalidValue {
                name: "CONTENT_DB_PATH".to_string(),
                message: "must differ from METADATA_DB_PATH".to_string(),
            });
        }
        Ok(())
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_i64(name: &str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
