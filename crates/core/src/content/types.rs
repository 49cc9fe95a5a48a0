//! Types for the content module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tracker::Namespace;

/// A listed artifact, before its bytes are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// Path-like key, unique within a namespace.
    pub key: String,
    pub modified_at: DateTime<Utc>,
}

/// An artifact with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub key: String,
    pub bytes: Vec<u8>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub key: String,
    pub cause: String,
}

/// Outcome of one `sync` call. Every list is sorted by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub namespace: Namespace,
    pub uploaded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            uploaded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.uploaded.len() + self.skipped.len() + self.failed.len()
    }

    pub(crate) fn sort(&mut self) {
        self.uploaded.sort();
        self.skipped.sort();
        self.failed.sort_by(|a, b| a.key.cmp(&b.key));
    }
}

/// Outcome of clearing a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearReport {
    pub namespace: Namespace,
    /// Documents removed from the content store.
    pub deleted: usize,
    /// Change records dropped from the tracker.
    pub records_cleared: usize,
}
