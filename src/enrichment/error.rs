use std::path::PathBuf;
use thiserror::Error;

/// Fatal enrichment failures.
///
/// Per-title lookup failures are not represented here: they are absorbed into
/// the record as the not-found sentinel.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// A result arrived for a title the store never saw.
    #[error("Unknown title in record store: {0:?}")]
    UnknownTitle(String),

    /// The store is missing titles the caller asked to assemble.
    #[error("Enrichment incomplete: {} title(s) missing from the record store (first: {:?})", .missing.len(), .missing.first())]
    IncompleteResult { missing: Vec<String> },

    /// The worker pool could not be started or lost workers mid-run.
    #[error("Scheduler failure: {0}")]
    Scheduler(String),

    /// The paper list failed its preconditions.
    #[error("Malformed paper list: {0}")]
    MalformedInput(String),

    /// Reading or writing the durable snapshot failed.
    #[error("Snapshot error at {path:?}: {message}")]
    Snapshot { path: PathBuf, message: String },
}

impl EnrichmentError {
    pub(crate) fn snapshot(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Snapshot {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type EnrichmentResult<T> = Result<T, EnrichmentError>;
