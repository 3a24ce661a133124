//! Error taxonomy for a sync run.
//!
//! Every variant of [`SyncError`] except `Manifest` is scoped to a single
//! manifest item: the coordinator logs it with the item identifier and moves
//! on. Avatar lookup failures never appear here; the resolver recovers them.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while processing a run or one of its items
#[derive(Debug, Error)]
pub enum SyncError {
    /// The source set could not be enumerated at all (fatal to the run)
    #[error("Failed to enumerate manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest entry could not be read
    #[error("Failed to read {filename}: {source}")]
    Load {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed source document
    #[error("Failed to parse {filename}: {reason}")]
    Parse { filename: String, reason: String },

    /// Malformed or missing version-control output
    #[error("Version history unavailable for {filename}: {source}")]
    History {
        filename: String,
        #[source]
        source: HistoryError,
    },

    /// Persistent store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    pub fn parse(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            filename: filename.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from the version-control history collaborator
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Malformed history line: {0:?}")]
    MalformedLine(String),

    #[error("No commit introduces {0}")]
    NoIntroducingCommit(String),

    #[error("History command failed: {0}")]
    Command(String),
}

/// Errors from the persistent store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Corrupt record {filename}: {reason}")]
    Corrupt { filename: String, reason: String },
}
