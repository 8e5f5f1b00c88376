//! Core error types for stint-core.
//!
//! This module defines the error hierarchy using thiserror. The timer
//! engine itself never surfaces these across its public operations
//! (invalid transitions are no-ops); they belong to the fallible edges
//! of the library: storage and configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for stint-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The database file could not be opened
    #[error("cannot open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A query against the records or kv tables failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Schema creation failed
    #[error("schema migration failed: {0}")]
    MigrationFailed(String),

    /// Another connection holds the write lock
    #[error("database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read or parsed
    #[error("cannot load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// The config file could not be written
    #[error("cannot save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// A value does not fit the key's type
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Dot-path lookup hit a key that does not exist
    #[error("unknown configuration key: {0}")]
    MissingKey(String),
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
