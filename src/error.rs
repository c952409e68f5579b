// Centralized error type for sync runs
// Fatal errors abort a run; per-file errors are carried as strings in the summary

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the sync engine and its collaborators.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Required settings are absent or malformed.
    #[error("Missing configuration: {field}")]
    MissingConfig { field: String },

    /// Transport-level failure talking to the remote.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with an unexpected status.
    #[error("Remote API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Remote rejected the token: {message}")]
    Unauthorized { message: String },

    #[error("Not found on remote: {path}")]
    NotFound { path: String },

    /// Update token did not match the remote's current blob.
    #[error("Update token conflict for {path}: {message}")]
    Conflict { path: String, message: String },

    #[error("Remote rate limit exhausted: {message}")]
    RateLimited { message: String },

    /// Local storage failure with the path that caused it.
    #[error("Storage error while {operation} {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Failed to decode transfer content: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Invalid exclusion rule '{rule}': {source}")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid response payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Token is locked; unlock it before editing")]
    TokenLocked,

    /// Another run holds the engine.
    #[error("A sync run is already in progress")]
    AlreadyRunning,
}

impl SyncError {
    /// Wrap an io::Error with the operation and path that produced it.
    pub fn storage(err: io::Error, operation: &str, path: impl Into<PathBuf>) -> Self {
        SyncError::Storage {
            path: path.into(),
            operation: operation.to_string(),
            source: err,
        }
    }

    pub fn missing(field: &str) -> Self {
        SyncError::MissingConfig {
            field: field.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
