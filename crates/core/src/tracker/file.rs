use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::backend::{PersistenceBackend, TrackerError};
use super::types::Namespace;

/// Stores each namespace as `{dir}/{namespace}.json`.
///
/// A missing file means the namespace was never synced. A file that exists
/// but cannot be read or parsed is corruption, never an empty set.
pub struct FileTrackerBackend {
    dir: PathBuf,
}

impl FileTrackerBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, namespace: &Namespace) -> PathBuf {
        self.dir.join(format!("{}.json", namespace))
    }
}

impl PersistenceBackend for FileTrackerBackend {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self, namespace: &Namespace) -> Result<BTreeMap<String, DateTime<Utc>>, TrackerError> {
        let path = self.path_for(namespace);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(TrackerError::corrupt(
                    namespace,
                    format!("cannot read {}: {}", path.display(), e),
                ))
            }
        };

        serde_json::from_str(&contents).map_err(|e| {
            TrackerError::corrupt(namespace, format!("cannot parse {}: {}", path.display(), e))
        })
    }

    fn store(
        &self,
        namespace: &Namespace,
        records: &BTreeMap<String, DateTime<Utc>>,
    ) -> Result<(), TrackerError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            TrackerError::Backend(format!("cannot create {}: {}", self.dir.display(), e))
        })?;

        let json = serde_json::to_string_pretty(records)
            .map_err(|e| TrackerError::Backend(e.to_string()))?;

        // Replace atomically: write a sibling temp file, then rename over.
        let path = self.path_for(namespace);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| TrackerError::Backend(format!("cannot write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| TrackerError::Backend(format!("cannot replace {}: {}", path.display(), e)))
    }

    fn clear(&self, namespace: &Namespace) -> Result<(), TrackerError> {
        match fs::remove_file(self.path_for(namespace)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TrackerError::Backend(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let backend = FileTrackerBackend::new(dir.path());
        assert!(backend.load(&Namespace::hub_modules()).unwrap().is_empty());
    }

    #[test]
    fn test_store_and_load() {
        let dir = tempdir().unwrap();
        let backend = FileTrackerBackend::new(dir.path().join("tracker"));
        let ns = Namespace::hub_modules();

        let mut records = BTreeMap::new();
        records.insert(
            "/data-hub/5/impl/hub-utils.xqy".to_string(),
            Utc.timestamp_opt(1_600_000_000, 5).unwrap(),
        );
        backend.store(&ns, &records).unwrap();

        assert!(dir.path().join("tracker/hub-modules.json").exists());
        assert_eq!(backend.load(&ns).unwrap(), records);
    }

    #[test]
    fn test_garbage_file_is_corruption() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("user-modules.json"), "{not json").unwrap();

        let backend = FileTrackerBackend::new(dir.path());
        let err = backend.load(&Namespace::user_modules()).unwrap_err();
        assert!(matches!(err, TrackerError::Corrupt { ref namespace, .. } if namespace == "user-modules"));
    }

    #[test]
    fn test_clear_missing_namespace_is_ok() {
        let dir = tempdir().unwrap();
        let backend = FileTrackerBackend::new(dir.path());
        assert!(backend.clear(&Namespace::user_modules()).is_ok());
    }
}
