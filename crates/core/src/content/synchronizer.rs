//! Incremental synchronizer.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use super::config::SyncConfig;
use super::error::{ContentError, SyncError};
use super::traits::{ArtifactSource, ContentStore};
use super::types::{ArtifactEntry, ClearReport, SyncFailure, SyncReport};
use crate::tracker::{ChangeTracker, Namespace, PersistenceBackend, TrackerError};

/// Uploads changed artifacts and keeps the change records in step with what
/// the store has acknowledged.
pub struct ContentSynchronizer {
    store: Arc<dyn ContentStore>,
    backend: Arc<dyn PersistenceBackend>,
    config: SyncConfig,
}

impl ContentSynchronizer {
    pub fn new(
        store: Arc<dyn ContentStore>,
        backend: Arc<dyn PersistenceBackend>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            backend,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Loads the current change records of a namespace.
    pub fn tracker(&self, namespace: &Namespace) -> Result<ChangeTracker, TrackerError> {
        ChangeTracker::load(namespace.clone(), self.backend.clone())
    }

    /// Uploads every artifact of `source` that changed since its last
    /// recorded sync.
    ///
    /// Uploads run up to `max_parallel_uploads` at a time. Change records are
    /// updated by this task alone, as each upload completes, and flushed once
    /// every upload has finished. A failed upload is reported and never
    /// recorded; the rest of the batch carries on.
    pub async fn sync(
        &self,
        namespace: &Namespace,
        source: &dyn ArtifactSource,
    ) -> Result<SyncReport, SyncError> {
        let mut tracker = self.tracker(namespace)?;
        let entries = source.list().await.map_err(|error| SyncError::Source {
            namespace: namespace.to_string(),
            source_name: source.describe(),
            error,
        })?;

        let mut report = SyncReport::new(namespace.clone());
        let mut pending = Vec::new();

        for entry in entries {
            if tracker.needs_sync(&entry.key, entry.modified_at) {
                debug!(namespace = %namespace, key = %entry.key, "Artifact changed");
                pending.push(entry);
                continue;
            }
            if !self.config.verify_destination {
                report.skipped.push(entry.key);
                continue;
            }
            match self.store.exists(namespace, &entry.key).await {
                Ok(true) => report.skipped.push(entry.key),
                Ok(false) => {
                    debug!(namespace = %namespace, key = %entry.key, "Tracked artifact missing from store");
                    pending.push(entry);
                }
                Err(e) => report.failed.push(SyncFailure {
                    key: entry.key,
                    cause: e.to_string(),
                }),
            }
        }

        let store = &self.store;
        let mut uploads = stream::iter(pending.into_iter().map(|entry| async move {
            let result = upload(store.as_ref(), namespace, source, &entry).await;
            (entry, result)
        }))
        .buffer_unordered(self.config.max_parallel_uploads.max(1));

        while let Some((entry, result)) = uploads.next().await {
            match result {
                Ok(()) => {
                    tracker.record_synced(&entry.key, entry.modified_at);
                    report.uploaded.push(entry.key);
                }
                Err(e) => {
                    warn!(namespace = %namespace, key = %entry.key, error = %e, "Artifact upload failed");
                    report.failed.push(SyncFailure {
                        key: entry.key,
                        cause: e.to_string(),
                    });
                }
            }
        }
        drop(uploads);

        tracker.flush()?;
        report.sort();

        info!(
            namespace = %namespace,
            source = %source.describe(),
            uploaded = report.uploaded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Sync finished"
        );
        Ok(report)
    }

    /// Removes a namespace's content from the store, then its change records.
    ///
    /// Records are only cleared once the store confirms the deletion, so a
    /// failed delete leaves every record in place.
    pub async fn clear_namespace(&self, namespace: &Namespace) -> Result<ClearReport, SyncError> {
        // A corrupt namespace can still be cleared; that is how it recovers.
        let held = self.backend.load(namespace).map(|r| r.len()).unwrap_or(0);

        let deleted = self
            .store
            .delete_namespace(namespace)
            .await
            .map_err(|e| {
                warn!(namespace = %namespace, error = %e, "Namespace delete failed, keeping change records");
                SyncError::Store(e)
            })?;

        self.backend.clear(namespace).map_err(|error| {
            error!(
                namespace = %namespace,
                error = %error,
                "Namespace content deleted but change records remain; clear it again before the next sync"
            );
            SyncError::RecordsNotCleared {
                namespace: namespace.to_string(),
                error,
            }
        })?;

        info!(
            namespace = %namespace,
            deleted = deleted,
            records_cleared = held,
            "Namespace cleared"
        );
        Ok(ClearReport {
            namespace: namespace.clone(),
            deleted,
            records_cleared: held,
        })
    }
}

async fn upload(
    store: &dyn ContentStore,
    namespace: &Namespace,
    source: &dyn ArtifactSource,
    entry: &ArtifactEntry,
) -> Result<(), ContentError> {
    let artifact = source.load(entry).await?;
    store.put(namespace, &artifact.key, &artifact.bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryArtifactSource, MockContentStore};
    use crate::tracker::SqliteTrackerBackend;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn synchronizer(store: Arc<MockContentStore>, config: SyncConfig) -> ContentSynchronizer {
        let backend = Arc::new(SqliteTrackerBackend::in_memory().unwrap());
        ContentSynchronizer::new(store, backend, config)
    }

    #[tokio::test]
    async fn test_second_sync_skips_everything() {
        let store = Arc::new(MockContentStore::new());
        let sync = synchronizer(store.clone(), SyncConfig::default());
        let source = MemoryArtifactSource::new("modules");
        source.put("/b.xqy", b"b", ts(1)).await;
        source.put("/a.xqy", b"a", ts(1)).await;
        let ns = Namespace::user_modules();

        let first = sync.sync(&ns, &source).await.unwrap();
        assert_eq!(first.uploaded, vec!["/a.xqy", "/b.xqy"]);
        assert!(first.skipped.is_empty());

        let second = sync.sync(&ns, &source).await.unwrap();
        assert!(second.uploaded.is_empty());
        assert_eq!(second.skipped, vec!["/a.xqy", "/b.xqy"]);
        assert_eq!(store.put_count().await, 2);
    }

    #[tokio::test]
    async fn test_failed_upload_is_not_recorded() {
        let store = Arc::new(MockContentStore::new());
        store.fail_key("/bad.xqy").await;
        let sync = synchronizer(store.clone(), SyncConfig::default());
        let source = MemoryArtifactSource::new("modules");
        source.put("/bad.xqy", b"x", ts(1)).await;
        source.put("/good.xqy", b"y", ts(1)).await;
        let ns = Namespace::user_modules();

        let report = sync.sync(&ns, &source).await.unwrap();
        assert_eq!(report.uploaded, vec!["/good.xqy"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].key, "/bad.xqy");

        let tracker = sync.tracker(&ns).unwrap();
        assert!(tracker.last_synced("/bad.xqy").is_none());
        assert_eq!(tracker.last_synced("/good.xqy"), Some(ts(1)));
    }

    #[tokio::test]
    async fn test_verify_destination_reuploads_missing() {
        let store = Arc::new(MockContentStore::new());
        let config = SyncConfig {
            verify_destination: true,
            ..SyncConfig::default()
        };
        let sync = synchronizer(store.clone(), config);
        let source = MemoryArtifactSource::new("modules");
        source.put("/a.xqy", b"a", ts(1)).await;
        let ns = Namespace::hub_modules();

        sync.sync(&ns, &source).await.unwrap();
        store.forget(&ns, "/a.xqy").await;

        let report = sync.sync(&ns, &source).await.unwrap();
        assert_eq!(report.uploaded, vec!["/a.xqy"]);
    }

    #[tokio::test]
    async fn test_clear_keeps_records_when_delete_fails() {
        let store = Arc::new(MockContentStore::new());
        let sync = synchronizer(store.clone(), SyncConfig::sequential());
        let source = MemoryArtifactSource::new("modules");
        source.put("/a.xqy", b"a", ts(1)).await;
        let ns = Namespace::user_modules();
        sync.sync(&ns, &source).await.unwrap();

        store.fail_delete(true).await;
        let err = sync.clear_namespace(&ns).await.unwrap_err();
        assert!(matches!(err, SyncError::Store(ContentError::DeleteFailed { .. })));
        assert_eq!(sync.tracker(&ns).unwrap().len(), 1);

        store.fail_delete(false).await;
        let report = sync.clear_namespace(&ns).await.unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(report.records_cleared, 1);
        assert!(sync.tracker(&ns).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unlistable_source_fails_sync() {
        let store = Arc::new(MockContentStore::new());
        let sync = synchronizer(store, SyncConfig::default());
        let source = MemoryArtifactSource::new("broken");
        source.fail_listing(true).await;

        let err = sync.sync(&Namespace::user_modules(), &source).await.unwrap_err();
        match err {
            SyncError::Source {
                namespace,
                source_name,
                ..
            } => {
                assert_eq!(namespace, "user-modules");
                assert_eq!(source_name, "memory:broken");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    /// Backend whose records can be read and written but never cleared.
    struct StuckBackend {
        inner: SqliteTrackerBackend,
    }

    impl PersistenceBackend for StuckBackend {
        fn name(&self) -> &str {
            "stuck"
        }

        fn load(
            &self,
            namespace: &Namespace,
        ) -> Result<std::collections::BTreeMap<String, DateTime<Utc>>, TrackerError> {
            self.inner.load(namespace)
        }

        fn store(
            &self,
            namespace: &Namespace,
            records: &std::collections::BTreeMap<String, DateTime<Utc>>,
        ) -> Result<(), TrackerError> {
            self.inner.store(namespace, records)
        }

        fn clear(&self, _namespace: &Namespace) -> Result<(), TrackerError> {
            Err(TrackerError::Backend("database is locked".into()))
        }
    }

    #[tokio::test]
    async fn test_clear_reports_records_left_after_delete() {
        let store = Arc::new(MockContentStore::new());
        let backend = Arc::new(StuckBackend {
            inner: SqliteTrackerBackend::in_memory().unwrap(),
        });
        let sync = ContentSynchronizer::new(store.clone(), backend, SyncConfig::default());
        let source = MemoryArtifactSource::new("modules");
        source.put("/a.xqy", b"a", ts(1)).await;
        let ns = Namespace::user_modules();
        sync.sync(&ns, &source).await.unwrap();

        let err = sync.clear_namespace(&ns).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::RecordsNotCleared { ref namespace, .. } if namespace == "user-modules"
        ));
        assert!(err.to_string().contains("run the clear again"));
        // content is gone while the record survives
        assert_eq!(store.document_count(&ns).await, 0);
        assert!(!sync.tracker(&ns).unwrap().needs_sync("/a.xqy", ts(1)));
    }
}
