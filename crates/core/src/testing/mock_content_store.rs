//! In-memory content store for testing.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::content::{ContentError, ContentStore};
use crate::tracker::Namespace;

/// A recorded put for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPut {
    pub namespace: Namespace,
    pub key: String,
    pub success: bool,
}

/// Mock implementation of the ContentStore trait.
///
/// Keeps documents in memory per namespace and records every put.
#[derive(Debug, Clone, Default)]
pub struct MockContentStore {
    documents: Arc<RwLock<BTreeMap<Namespace, BTreeMap<String, Vec<u8>>>>>,
    puts: Arc<RwLock<Vec<RecordedPut>>>,
    failing_keys: Arc<RwLock<HashSet<String>>>,
    cancelled_keys: Arc<RwLock<HashSet<String>>>,
    fail_delete: Arc<RwLock<bool>>,
}

impl MockContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every put of `key`.
    pub async fn fail_key(&self, key: &str) {
        self.failing_keys.write().await.insert(key.to_string());
    }

    /// Report every put of `key` as cancelled before acknowledgement.
    pub async fn cancel_key(&self, key: &str) {
        self.cancelled_keys.write().await.insert(key.to_string());
    }

    pub async fn clear_failures(&self) {
        self.failing_keys.write().await.clear();
        self.cancelled_keys.write().await.clear();
    }

    pub async fn fail_delete(&self, fail: bool) {
        *self.fail_delete.write().await = fail;
    }

    /// Drops a stored document without telling anyone, as an out-of-band
    /// deletion on the remote would.
    pub async fn forget(&self, namespace: &Namespace, key: &str) {
        if let Some(docs) = self.documents.write().await.get_mut(namespace) {
            docs.remove(key);
        }
    }

    pub async fn recorded_puts(&self) -> Vec<RecordedPut> {
        self.puts.read().await.clone()
    }

    /// Number of successful puts.
    pub async fn put_count(&self) -> usize {
        self.puts.read().await.iter().filter(|p| p.success).count()
    }

    /// Keys of successful puts, in call order.
    pub async fn uploaded_keys(&self, namespace: &Namespace) -> Vec<String> {
        self.puts
            .read()
            .await
            .iter()
            .filter(|p| p.success && &p.namespace == namespace)
            .map(|p| p.key.clone())
            .collect()
    }

    pub async fn clear_recorded_puts(&self) {
        self.puts.write().await.clear();
    }

    pub async fn document(&self, namespace: &Namespace, key: &str) -> Option<Vec<u8>> {
        self.documents
            .read()
            .await
            .get(namespace)
            .and_then(|docs| docs.get(key).cloned())
    }

    pub async fn document_count(&self, namespace: &Namespace) -> usize {
        self.documents
            .read()
            .await
            .get(namespace)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn put(&self, namespace: &Namespace, key: &str, bytes: &[u8]) -> Result<(), ContentError> {
        let result = if self.failing_keys.read().await.contains(key) {
            Err(ContentError::Rejected {
                key: key.to_string(),
                message: "rejected by mock".to_string(),
            })
        } else if self.cancelled_keys.read().await.contains(key) {
            Err(ContentError::Cancelled(key.to_string()))
        } else {
            self.documents
                .write()
                .await
                .entry(namespace.clone())
                .or_default()
                .insert(key.to_string(), bytes.to_vec());
            Ok(())
        };

        self.puts.write().await.push(RecordedPut {
            namespace: namespace.clone(),
            key: key.to_string(),
            success: result.is_ok(),
        });
        result
    }

    async fn exists(&self, namespace: &Namespace, key: &str) -> Result<bool, ContentError> {
        Ok(self.document(namespace, key).await.is_some())
    }

    async fn delete_namespace(&self, namespace: &Namespace) -> Result<usize, ContentError> {
        if *self.fail_delete.read().await {
            return Err(ContentError::DeleteFailed {
                namespace: namespace.to_string(),
                message: "delete failed in mock".to_string(),
            });
        }
        Ok(self
            .documents
            .write()
            .await
            .remove(namespace)
            .map(|docs| docs.len())
            .unwrap_or(0))
    }
}
