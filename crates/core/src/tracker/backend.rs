//! Persistence port for change records.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use super::types::Namespace;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("invalid namespace '{0}': use lowercase letters, digits, '-', '_' or '.'")]
    InvalidNamespace(String),

    #[error("change records for namespace {namespace} are corrupt: {reason}")]
    Corrupt { namespace: String, reason: String },

    #[error("tracker backend error: {0}")]
    Backend(String),
}

impl TrackerError {
    pub(crate) fn corrupt(namespace: &Namespace, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            namespace: namespace.to_string(),
            reason: reason.into(),
        }
    }
}

/// Durable key → last-synced timestamp mapping, partitioned by namespace.
///
/// A namespace that was never stored loads as empty. Operations on one
/// namespace never touch the records of another.
pub trait PersistenceBackend: Send + Sync {
    /// Returns the name of this backend implementation.
    fn name(&self) -> &str;

    /// Loads every record of a namespace.
    fn load(&self, namespace: &Namespace) -> Result<BTreeMap<String, DateTime<Utc>>, TrackerError>;

    /// Replaces the records of a namespace.
    fn store(
        &self,
        namespace: &Namespace,
        records: &BTreeMap<String, DateTime<Utc>>,
    ) -> Result<(), TrackerError>;

    /// Removes every record of a namespace.
    fn clear(&self, namespace: &Namespace) -> Result<(), TrackerError>;
}
