//! Configuration for the content synchronizer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum uploads in flight at once.
    #[serde(default = "default_max_parallel_uploads")]
    pub max_parallel_uploads: usize,

    /// Check skipped artifacts with `exists` and re-upload missing ones.
    #[serde(default)]
    pub verify_destination: bool,
}

fn default_max_parallel_uploads() -> usize {
    4
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_parallel_uploads: default_max_parallel_uploads(),
            verify_destination: false,
        }
    }
}

impl SyncConfig {
    /// Sequential uploads (useful for deterministic tests).
    pub fn sequential() -> Self {
        Self {
            max_parallel_uploads: 1,
            ..Self::default()
        }
    }
}
