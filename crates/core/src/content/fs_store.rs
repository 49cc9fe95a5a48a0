//! Filesystem content store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::error::ContentError;
use super::traits::ContentStore;
use crate::tracker::Namespace;

/// Stores each namespace in its own directory under `root`, mirroring keys
/// as relative paths.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &Namespace) -> PathBuf {
        self.root.join(namespace.as_str())
    }

    fn path_for(&self, namespace: &Namespace, key: &str) -> Result<PathBuf, ContentError> {
        let relative = key.trim_start_matches('/');
        if relative.is_empty() || relative.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(ContentError::Rejected {
                key: key.to_string(),
                message: "key is not a clean relative path".to_string(),
            });
        }
        Ok(self.namespace_dir(namespace).join(relative))
    }
}

async fn count_files(dir: &Path) -> Result<usize, std::io::Error> {
    let mut count = 0;
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut reader = fs::read_dir(&dir).await?;
        while let Some(entry) = reader.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                pending.push(entry.path());
            } else {
                count += 1;
            }
        }
    }
    Ok(count)
}

#[async_trait]
impl ContentStore for FsContentStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn put(&self, namespace: &Namespace, key: &str, bytes: &[u8]) -> Result<(), ContentError> {
        let path = self.path_for(namespace, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn exists(&self, namespace: &Namespace, key: &str) -> Result<bool, ContentError> {
        let path = self.path_for(namespace, key)?;
        Ok(fs::metadata(path).await.is_ok())
    }

    async fn delete_namespace(&self, namespace: &Namespace) -> Result<usize, ContentError> {
        let dir = self.namespace_dir(namespace);
        if fs::metadata(&dir).await.is_err() {
            return Ok(0);
        }
        let delete_failed = |e: std::io::Error| ContentError::DeleteFailed {
            namespace: namespace.to_string(),
            message: e.to_string(),
        };
        let count = count_files(&dir).await.map_err(delete_failed)?;
        fs::remove_dir_all(&dir).await.map_err(delete_failed)?;
        Ok(count)
    }
}
