//! Error types for the content module.

use thiserror::Error;

use crate::tracker::TrackerError;

/// Errors raised by artifact sources and content stores.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    /// The artifact source root or an artifact vanished.
    #[error("artifact not found: {0}")]
    SourceNotFound(String),

    /// An artifact exists but could not be read.
    #[error("failed to read artifact {key}: {message}")]
    ReadFailed { key: String, message: String },

    /// The store refused the artifact.
    #[error("content store rejected {key}: {message}")]
    Rejected { key: String, message: String },

    /// The store could not be reached.
    #[error("content store unavailable: {0}")]
    Unavailable(String),

    /// Deleting a namespace from the store failed.
    #[error("failed to delete namespace {namespace}: {message}")]
    DeleteFailed { namespace: String, message: String },

    /// The operation was cancelled before the store acknowledged it.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// The store cannot be set up as configured.
    #[error("invalid content store settings: {0}")]
    Settings(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ContentError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Errors that stop a whole sync or clear. Individual upload failures are
/// reported in the [`SyncReport`](super::SyncReport) instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// The artifact source of a namespace could not be listed.
    #[error("cannot list artifacts for {namespace} from {source_name}: {error}")]
    Source {
        namespace: String,
        source_name: String,
        error: ContentError,
    },

    /// Destination content could not be removed; tracker records were kept.
    #[error(transparent)]
    Store(ContentError),

    /// Destination content is gone but the change records survived, so a
    /// sync would skip the deleted artifacts. Clearing again recovers.
    #[error("content of {namespace} was deleted but its change records were not cleared ({error}); run the clear again before syncing")]
    RecordsNotCleared {
        namespace: String,
        error: TrackerError,
    },
}
