use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::backend::{PersistenceBackend, TrackerError};
use super::types::{ChangeRecord, Namespace};

/// In-memory view of one namespace's change records.
///
/// Records are loaded once, updated as uploads are confirmed and written back
/// with [`flush`](Self::flush). Timestamps only ever move forward.
pub struct ChangeTracker {
    namespace: Namespace,
    backend: Arc<dyn PersistenceBackend>,
    records: BTreeMap<String, DateTime<Utc>>,
    dirty: bool,
}

impl ChangeTracker {
    /// Loads the namespace from the backend. A namespace with no persisted
    /// records starts empty, so the first sync uploads everything.
    pub fn load(
        namespace: Namespace,
        backend: Arc<dyn PersistenceBackend>,
    ) -> Result<Self, TrackerError> {
        let records = backend.load(&namespace)?;
        tracing::debug!(
            namespace = %namespace,
            backend = backend.name(),
            records = records.len(),
            "Loaded change records"
        );
        Ok(Self {
            namespace,
            backend,
            records,
            dirty: false,
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// True when `key` was never synced or was modified strictly after its
    /// last recorded sync.
    pub fn needs_sync(&self, key: &str, source_modified_at: DateTime<Utc>) -> bool {
        match self.records.get(key) {
            Some(last_synced_at) => source_modified_at > *last_synced_at,
            None => true,
        }
    }

    /// Records a confirmed upload. An older timestamp than the one already
    /// held is ignored.
    pub fn record_synced(&mut self, key: &str, synced_at: DateTime<Utc>) {
        match self.records.get_mut(key) {
            Some(existing) if *existing >= synced_at => {}
            Some(existing) => {
                *existing = synced_at;
                self.dirty = true;
            }
            None => {
                self.records.insert(key.to_string(), synced_at);
                self.dirty = true;
            }
        }
    }

    pub fn last_synced(&self, key: &str) -> Option<DateTime<Utc>> {
        self.records.get(key).copied()
    }

    pub fn records(&self) -> impl Iterator<Item = ChangeRecord> + '_ {
        self.records.iter().map(|(key, at)| ChangeRecord {
            key: key.clone(),
            last_synced_at: *at,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes pending changes to the backend. A no-op when nothing changed.
    pub fn flush(&mut self) -> Result<(), TrackerError> {
        if !self.dirty {
            return Ok(());
        }
        self.backend.store(&self.namespace, &self.records)?;
        self.dirty = false;
        tracing::debug!(
            namespace = %self.namespace,
            records = self.records.len(),
            "Flushed change records"
        );
        Ok(())
    }

    /// Drops every record of this namespace, in memory and in the backend.
    /// Returns how many records were held.
    pub fn clear(&mut self) -> Result<usize, TrackerError> {
        self.backend.clear(&self.namespace)?;
        let cleared = self.records.len();
        self.records.clear();
        self.dirty = false;
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::SqliteTrackerBackend;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn tracker() -> ChangeTracker {
        let backend = Arc::new(SqliteTrackerBackend::in_memory().unwrap());
        ChangeTracker::load(Namespace::user_modules(), backend).unwrap()
    }

    #[test]
    fn test_unknown_key_needs_sync() {
        let tracker = tracker();
        assert!(tracker.needs_sync("/a.xqy", ts(1)));
    }

    #[test]
    fn test_unchanged_key_is_skipped() {
        let mut tracker = tracker();
        tracker.record_synced("/a.xqy", ts(10));
        assert!(!tracker.needs_sync("/a.xqy", ts(10)));
        assert!(!tracker.needs_sync("/a.xqy", ts(5)));
        assert!(tracker.needs_sync("/a.xqy", ts(11)));
    }

    #[test]
    fn test_record_never_rolls_back() {
        let mut tracker = tracker();
        tracker.record_synced("/a.xqy", ts(10));
        tracker.record_synced("/a.xqy", ts(3));
        assert_eq!(tracker.last_synced("/a.xqy"), Some(ts(10)));
    }

    #[test]
    fn test_flush_and_reload() {
        let backend: Arc<dyn PersistenceBackend> =
            Arc::new(SqliteTrackerBackend::in_memory().unwrap());
        let mut tracker = ChangeTracker::load(Namespace::hub_modules(), backend.clone()).unwrap();
        tracker.record_synced("/a.xqy", ts(7));
        tracker.flush().unwrap();

        let reloaded = ChangeTracker::load(Namespace::hub_modules(), backend).unwrap();
        assert_eq!(reloaded.last_synced("/a.xqy"), Some(ts(7)));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_unflushed_records_are_not_persisted() {
        let backend: Arc<dyn PersistenceBackend> =
            Arc::new(SqliteTrackerBackend::in_memory().unwrap());
        let mut tracker = ChangeTracker::load(Namespace::hub_modules(), backend.clone()).unwrap();
        tracker.record_synced("/a.xqy", ts(7));
        drop(tracker);

        let reloaded = ChangeTracker::load(Namespace::hub_modules(), backend).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_clear_reports_count() {
        let mut tracker = tracker();
        tracker.record_synced("/a.xqy", ts(1));
        tracker.record_synced("/b.xqy", ts(1));
        tracker.flush().unwrap();

        assert_eq!(tracker.clear().unwrap(), 2);
        assert!(tracker.is_empty());
        assert!(tracker.needs_sync("/a.xqy", ts(1)));
    }
}
