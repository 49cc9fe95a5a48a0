//! Change tracking for incremental artifact synchronisation.
//!
//! A [`ChangeTracker`] remembers, per namespace, when each artifact key was
//! last uploaded. Records live in a [`PersistenceBackend`] so that a later
//! run only uploads artifacts modified since then.
//!
//! # Example
//!
//! ```ignore
//! use hubdeploy_core::tracker::{ChangeTracker, Namespace, SqliteTrackerBackend};
//!
//! let backend = Arc::new(SqliteTrackerBackend::new(Path::new(".hubdeploy/tracker.db"))?);
//! let mut tracker = ChangeTracker::load(Namespace::user_modules(), backend)?;
//!
//! if tracker.needs_sync("/ext/lib.xqy", modified_at) {
//!     // upload, then:
//!     tracker.record_synced("/ext/lib.xqy", modified_at);
//! }
//! tracker.flush()?;
//! ```

mod backend;
mod change_tracker;
mod file;
mod sqlite;
mod types;

pub use backend::{PersistenceBackend, TrackerError};
pub use change_tracker::ChangeTracker;
pub use file::FileTrackerBackend;
pub use sqlite::SqliteTrackerBackend;
pub use types::{ChangeRecord, Namespace};
