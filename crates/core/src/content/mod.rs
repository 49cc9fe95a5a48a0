//! Incremental artifact synchronisation.
//!
//! The [`ContentSynchronizer`] walks an [`ArtifactSource`], asks the
//! namespace's [`ChangeTracker`](crate::tracker::ChangeTracker) which
//! artifacts changed, uploads those to a [`ContentStore`] and records each
//! confirmed upload.
//!
//! # Flow
//!
//! ```text
//! source.list() ──► needs_sync? ──yes──► source.load() ──► store.put() ──ok──► record_synced
//!                        │                                        │
//!                        no ──► skipped                           err ──► failed (batch continues)
//! ```

mod config;
mod error;
mod fs_source;
mod fs_store;
mod http_store;
mod prefixed;
mod synchronizer;
mod traits;
mod types;

pub use config::SyncConfig;
pub use error::{ContentError, SyncError};
pub use fs_source::FsArtifactSource;
pub use fs_store::FsContentStore;
pub use http_store::HttpContentStore;
pub use prefixed::PrefixedSource;
pub use synchronizer::ContentSynchronizer;
pub use traits::{ArtifactSource, ContentStore};
pub use types::{Artifact, ArtifactEntry, ClearReport, SyncFailure, SyncReport};
