//! Key-prefixing view over another artifact source.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::ContentError;
use super::traits::ArtifactSource;
use super::types::{Artifact, ArtifactEntry};

/// Presents `inner`'s artifacts under `prefix`, e.g. `/Evaluator/data-hub-FINAL/rest-api/options`.
pub struct PrefixedSource {
    inner: Arc<dyn ArtifactSource>,
    prefix: String,
}

impl PrefixedSource {
    pub fn new(inner: Arc<dyn ArtifactSource>, prefix: &str) -> Self {
        let trimmed = prefix.trim_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        };
        Self { inner, prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[async_trait]
impl ArtifactSource for PrefixedSource {
    fn describe(&self) -> String {
        format!("{} as {}", self.inner.describe(), self.prefix)
    }

    async fn list(&self) -> Result<Vec<ArtifactEntry>, ContentError> {
        let entries = self.inner.list().await?;
        Ok(entries
            .into_iter()
            .map(|entry| ArtifactEntry {
                key: format!("{}{}", self.prefix, entry.key),
                modified_at: entry.modified_at,
            })
            .collect())
    }

    async fn load(&self, entry: &ArtifactEntry) -> Result<Artifact, ContentError> {
        let inner_key = entry
            .key
            .strip_prefix(&self.prefix)
            .ok_or_else(|| ContentError::SourceNotFound(entry.key.clone()))?;
        let inner_entry = ArtifactEntry {
            key: inner_key.to_string(),
            modified_at: entry.modified_at,
        };
        let artifact = self.inner.load(&inner_entry).await?;
        Ok(Artifact {
            key: entry.key.clone(),
            ..artifact
        })
    }
}
