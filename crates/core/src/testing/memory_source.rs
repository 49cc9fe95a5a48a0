//! In-memory artifact source for testing.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::content::{Artifact, ArtifactEntry, ArtifactSource, ContentError};

/// Artifacts with settable modification times.
#[derive(Debug, Clone)]
pub struct MemoryArtifactSource {
    name: String,
    artifacts: Arc<RwLock<BTreeMap<String, (Vec<u8>, DateTime<Utc>)>>>,
    fail_listing: Arc<RwLock<bool>>,
}

impl MemoryArtifactSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            artifacts: Arc::new(RwLock::new(BTreeMap::new())),
            fail_listing: Arc::new(RwLock::new(false)),
        }
    }

    /// Adds or replaces an artifact.
    pub async fn put(&self, key: &str, bytes: &[u8], modified_at: DateTime<Utc>) {
        self.artifacts
            .write()
            .await
            .insert(key.to_string(), (bytes.to_vec(), modified_at));
    }

    /// Sets a new modification time without changing the bytes.
    pub async fn touch(&self, key: &str, modified_at: DateTime<Utc>) {
        if let Some(entry) = self.artifacts.write().await.get_mut(key) {
            entry.1 = modified_at;
        }
    }

    /// Moves a modification time forward by `seconds`.
    pub async fn touch_later(&self, key: &str, seconds: i64) {
        if let Some(entry) = self.artifacts.write().await.get_mut(key) {
            entry.1 += Duration::seconds(seconds);
        }
    }

    pub async fn remove(&self, key: &str) {
        self.artifacts.write().await.remove(key);
    }

    pub async fn fail_listing(&self, fail: bool) {
        *self.fail_listing.write().await = fail;
    }
}

#[async_trait]
impl ArtifactSource for MemoryArtifactSource {
    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }

    async fn list(&self) -> Result<Vec<ArtifactEntry>, ContentError> {
        if *self.fail_listing.read().await {
            return Err(ContentError::Io(format!("{} is unreadable", self.name)));
        }
        Ok(self
            .artifacts
            .read()
            .await
            .iter()
            .map(|(key, (_, modified_at))| ArtifactEntry {
                key: key.clone(),
                modified_at: *modified_at,
            })
            .collect())
    }

    async fn load(&self, entry: &ArtifactEntry) -> Result<Artifact, ContentError> {
        let artifacts = self.artifacts.read().await;
        let (bytes, modified_at) = artifacts
            .get(&entry.key)
            .ok_or_else(|| ContentError::SourceNotFound(entry.key.clone()))?;
        Ok(Artifact {
            key: entry.key.clone(),
            bytes: bytes.clone(),
            modified_at: *modified_at,
        })
    }
}
