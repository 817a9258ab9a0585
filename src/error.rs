//! Error types for merge, download, harvest and persistence operations.

use crate::download::retry::MirrorFailure;
use thiserror::Error;

/// Errors raised while reconciling two catalogue snapshots
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// Both sides of a merge must describe the same entity
    #[error("cannot merge {level} nodes with different identities: {left} vs {right}")]
    IdentityMismatch {
        level: &'static str,
        left: String,
        right: String,
    },

    #[error("no {level} was given to merge")]
    EmptyMergeSet { level: &'static str },
}

/// Errors raised by a single mirror fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mirror answered with status {0}")]
    Status(u16),
}

/// Errors raised while materializing partition files
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("all {} mirror attempt(s) for partition {time} failed; last error: {}", .failures.len(), last_failure(.failures))]
    AllMirrorsExhausted {
        time: String,
        failures: Vec<MirrorFailure>,
    },

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("partition {0} has no mirrors")]
    NoMirrors(String),

    #[error("download cancelled")]
    Cancelled,

    #[error("every download in the batch failed ({failed} of {total})")]
    BatchFailed { failed: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn last_failure(failures: &[MirrorFailure]) -> String {
    failures
        .last()
        .map(|f| f.to_string())
        .unwrap_or_else(|| "none recorded".to_string())
}

/// Errors raised by a collector while walking the remote archive
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to collect {level} for {parent}: {message}")]
    Source {
        level: &'static str,
        parent: String,
        message: String,
    },

    #[error("collector returned malformed data: {0}")]
    Malformed(String),
}

/// Errors raised while loading or saving catalogue files
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to fetch remote catalogue: {0}")]
    Http(#[from] reqwest::Error),
}

/// Top-level error surfaced by the CLI and convenience APIs
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
