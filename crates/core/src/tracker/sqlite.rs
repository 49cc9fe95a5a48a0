use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};

use super::backend::{PersistenceBackend, TrackerError};
use super::types::Namespace;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS change_records (
    namespace TEXT NOT NULL,
    key TEXT NOT NULL,
    synced_at TEXT NOT NULL,
    PRIMARY KEY (namespace, key)
);
"#;

/// SQLite-backed change records. One table, partitioned by namespace.
pub struct SqliteTrackerBackend {
    conn: Mutex<Connection>,
}

impl SqliteTrackerBackend {
    /// Opens (or creates) the tracker database, creating parent directories
    /// as needed.
    pub fn new(path: &Path) -> Result<Self, TrackerError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                TrackerError::Backend(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path).map_err(|e| TrackerError::Backend(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// In-memory database (useful for testing)
    pub fn in_memory() -> Result<Self, TrackerError> {
        let conn = Connection::open_in_memory().map_err(|e| TrackerError::Backend(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, TrackerError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| TrackerError::Backend(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, TrackerError> {
        self.conn
            .lock()
            .map_err(|_| TrackerError::Backend("tracker connection lock poisoned".to_string()))
    }
}

impl PersistenceBackend for SqliteTrackerBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn load(&self, namespace: &Namespace) -> Result<BTreeMap<String, DateTime<Utc>>, TrackerError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key, synced_at FROM change_records WHERE namespace = ?1")
            .map_err(|e| TrackerError::Backend(e.to_string()))?;

        let rows = stmt
            .query_map(params![namespace.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| TrackerError::Backend(e.to_string()))?;

        let mut records = BTreeMap::new();
        for row in rows {
            let (key, synced_at) = row.map_err(|e| TrackerError::corrupt(namespace, e.to_string()))?;
            let synced_at = DateTime::parse_from_rfc3339(&synced_at)
                .map_err(|e| {
                    TrackerError::corrupt(
                        namespace,
                        format!("bad timestamp '{}' for key {}: {}", synced_at, key, e),
                    )
                })?
                .with_timezone(&Utc);
            records.insert(key, synced_at);
        }
        Ok(records)
    }

    fn store(
        &self,
        namespace: &Namespace,
        records: &BTreeMap<String, DateTime<Utc>>,
    ) -> Result<(), TrackerError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| TrackerError::Backend(e.to_string()))?;

        tx.execute(
            "DELETE FROM change_records WHERE namespace = ?1",
            params![namespace.as_str()],
        )
        .map_err(|e| TrackerError::Backend(e.to_string()))?;

        {
            let mut insert = tx
                .prepare(
                    "INSERT INTO change_records (namespace, key, synced_at) VALUES (?1, ?2, ?3)",
                )
                .map_err(|e| TrackerError::Backend(e.to_string()))?;
            for (key, synced_at) in records {
                insert
                    .execute(params![
                        namespace.as_str(),
                        key,
                        synced_at.to_rfc3339_opts(SecondsFormat::Nanos, true)
                    ])
                    .map_err(|e| TrackerError::Backend(e.to_string()))?;
            }
        }

        tx.commit().map_err(|e| TrackerError::Backend(e.to_string()))
    }

    fn clear(&self, namespace: &Namespace) -> Result<(), TrackerError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM change_records WHERE namespace = ?1",
            params![namespace.as_str()],
        )
        .map_err(|e| TrackerError::Backend(e.to_string()))?;
        Ok(())
    }
}
