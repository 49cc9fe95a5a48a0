//! Local directory artifact source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;

use super::error::ContentError;
use super::traits::ArtifactSource;
use super::types::{Artifact, ArtifactEntry};

/// Walks a directory tree. Keys are `/`-separated paths relative to the root,
/// with a leading `/`. Dotfiles and dot-directories are ignored. A missing
/// root lists as empty.
#[derive(Debug, Clone)]
pub struct FsArtifactSource {
    root: PathBuf,
}

impl FsArtifactSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_for(&self, relative: &Path) -> String {
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        format!("/{}", parts.join("/"))
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let relative = key.strip_prefix('/')?;
        if relative.split('/').any(|part| part == "..") {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactSource for FsArtifactSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn list(&self) -> Result<Vec<ArtifactEntry>, ContentError> {
        if fs::metadata(&self.root).await.is_err() {
            tracing::debug!(root = %self.root.display(), "Artifact root missing, nothing to list");
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut reader = fs::read_dir(&dir).await?;
            while let Some(entry) = reader.next_entry().await? {
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                let path = entry.path();
                let meta = entry.metadata().await?;
                if meta.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !meta.is_file() {
                    continue;
                }

                let relative = path
                    .strip_prefix(&self.root)
                    .map_err(|e| ContentError::Io(e.to_string()))?;
                let modified_at: DateTime<Utc> = meta.modified()?.into();
                entries.push(ArtifactEntry {
                    key: self.key_for(relative),
                    modified_at,
                });
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn load(&self, entry: &ArtifactEntry) -> Result<Artifact, ContentError> {
        let path = self
            .path_for(&entry.key)
            .ok_or_else(|| ContentError::SourceNotFound(entry.key.clone()))?;

        let bytes = fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ContentError::SourceNotFound(entry.key.clone()),
            _ => ContentError::ReadFailed {
                key: entry.key.clone(),
                message: e.to_string(),
            },
        })?;

        Ok(Artifact {
            key: entry.key.clone(),
            bytes,
            modified_at: entry.modified_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(path, contents).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_is_recursive_and_sorted() {
        let dir = tempdir().unwrap();
        write(dir.path(), "ext/z.xqy", "z").await;
        write(dir.path(), "b.sjs", "b").await;
        write(dir.path(), "ext/nested/a.xqy", "a").await;
        write(dir.path(), ".hidden/secret", "s").await;
        write(dir.path(), ".DS_Store", "").await;

        let source = FsArtifactSource::new(dir.path());
        let keys: Vec<_> = source
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();

        assert_eq!(keys, vec!["/b.sjs", "/ext/nested/a.xqy", "/ext/z.xqy"]);
    }

    #[tokio::test]
    async fn test_missing_root_lists_empty() {
        let dir = tempdir().unwrap();
        let source = FsArtifactSource::new(dir.path().join("nope"));
        assert!(source.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_reads_bytes() {
        let dir = tempdir().unwrap();
        write(dir.path(), "options/default.xml", "<options/>").await;

        let source = FsArtifactSource::new(dir.path());
        let entries = source.list().await.unwrap();
        let artifact = source.load(&entries[0]).await.unwrap();
        assert_eq!(artifact.key, "/options/default.xml");
        assert_eq!(artifact.bytes, b"<options/>");
    }

    #[tokio::test]
    async fn test_load_vanished_artifact() {
        let dir = tempdir().unwrap();
        write(dir.path(), "gone.xqy", "x").await;
        let source = FsArtifactSource::new(dir.path());
        let entries = source.list().await.unwrap();
        fs::remove_file(dir.path().join("gone.xqy")).await.unwrap();

        let err = source.load(&entries[0]).await.unwrap_err();
        assert_eq!(err, ContentError::SourceNotFound("/gone.xqy".to_string()));
    }
}
