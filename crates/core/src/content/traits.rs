//! Trait definitions for the content module.

use async_trait::async_trait;

use super::error::ContentError;
use super::types::{Artifact, ArtifactEntry};
use crate::tracker::Namespace;

/// A finite, restartable set of local artifacts.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Human-readable origin, used in logs and errors.
    fn describe(&self) -> String;

    /// Lists every artifact, sorted by key. Listing twice yields the same
    /// set when nothing changed.
    async fn list(&self) -> Result<Vec<ArtifactEntry>, ContentError>;

    /// Reads one artifact's bytes.
    async fn load(&self, entry: &ArtifactEntry) -> Result<Artifact, ContentError>;
}

/// Remote artifact repository, partitioned by namespace.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Returns the name of this store implementation.
    fn name(&self) -> &str;

    /// Stores one artifact. `Ok` means the store acknowledged the write.
    async fn put(&self, namespace: &Namespace, key: &str, bytes: &[u8]) -> Result<(), ContentError>;

    async fn exists(&self, namespace: &Namespace, key: &str) -> Result<bool, ContentError>;

    /// Removes everything stored under a namespace. Returns how many
    /// documents were removed, when the store can tell.
    async fn delete_namespace(&self, namespace: &Namespace) -> Result<usize, ContentError>;
}
