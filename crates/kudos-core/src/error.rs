//! Core error types for kudos-core.
//!
//! All engine failures are explicit `Result` values so callers can
//! distinguish "user needs to wait" from "system is broken".

use std::path::PathBuf;
use thiserror::Error;

use crate::claim_window::TimeRemaining;

/// Core error type for kudos-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Daily claim attempted before the claim window elapsed. No state was
    /// mutated; the caller can retry after the remaining time.
    #[error("daily claim not available yet: {remaining} remaining")]
    AlreadyClaimed { remaining: TimeRemaining },

    /// Task completion attempted twice on the same calendar day. No state
    /// was mutated.
    #[error("task '{task_type}' already completed today")]
    AlreadyCompletedToday { task_type: String },

    /// A caller passed a non-positive point amount.
    #[error("point amount must be positive, got {0}")]
    InvalidPoints(i64),

    /// Optimistic updates kept conflicting with concurrent writers for the
    /// same user and the retry budget ran out.
    #[error("concurrent updates kept conflicting for user '{user_id}'")]
    Contention { user_id: String },

    /// Storage-related errors
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the database
    #[error("failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Failed to prepare the data directory
    #[error("failed to prepare data directory: {0}")]
    DataDir(#[from] std::io::Error),

    /// Query execution failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
