use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for configuration, discovery, accession-table, and persistence failures.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Invalid option or unusable path.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Fewer discovered items than requested buckets.
    #[error("total buckets {buckets} cannot be greater than the number of detected items {found}")]
    InsufficientItems {
        /// Items available to partition.
        found: usize,
        /// Buckets requested.
        buckets: usize,
    },
    /// Accession table could not be read or lacks a required column.
    #[error("accession table '{}' is unusable: {}", .path.display(), .reason)]
    AccessionTable {
        /// Table location (empty when parsed from a reader).
        path: PathBuf,
        /// Parser or IO message.
        reason: String,
    },
    /// Schedule JSON could not be encoded or decoded.
    #[error("schedule serialization failed: {0}")]
    Serialization(String),
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for ScheduleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
