//! Resource descriptors loaded from a project's configuration directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a JSON object: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Directory-backed group of resource files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogSection {
    Privileges,
    Roles,
    Amps,
    Databases,
    Servers,
    DatabaseFields,
    /// Triggers supplied by the project.
    UserTriggers,
    /// Triggers shipped with the hub itself.
    HubTriggers,
}

impl CatalogSection {
    pub const ALL: [CatalogSection; 8] = [
        Self::Privileges,
        Self::Roles,
        Self::Amps,
        Self::Databases,
        Self::Servers,
        Self::DatabaseFields,
        Self::UserTriggers,
        Self::HubTriggers,
    ];

    /// Location relative to the config directory.
    pub fn directory(&self) -> &'static str {
        match self {
            Self::Privileges => "security/privileges",
            Self::Roles => "security/roles",
            Self::Amps => "security/amps",
            Self::Databases => "databases",
            Self::Servers => "servers",
            Self::DatabaseFields => "database-fields",
            Self::UserTriggers => "triggers",
            Self::HubTriggers => "hub-triggers",
        }
    }

    /// Payload field holding the resource id.
    pub fn id_field(&self) -> &'static str {
        match self {
            Self::Privileges => "privilege-name",
            Self::Roles => "role-name",
            Self::Amps => "local-name",
            Self::Databases => "database-name",
            Self::Servers => "server-name",
            Self::DatabaseFields => "field-name",
            Self::UserTriggers | Self::HubTriggers => "name",
        }
    }
}

/// One resource file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub file_name: String,
    pub payload: serde_json::Value,
}

impl CatalogEntry {
    /// Builds an entry whose id comes from the section's id field.
    pub fn from_payload(
        section: CatalogSection,
        file_name: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        let file_name = file_name.into();
        let id = payload
            .get(section.id_field())
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| file_stem(&file_name));
        Self {
            id,
            file_name,
            payload,
        }
    }
}

fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Every resource known to an install, grouped by section and sorted by
/// file name within a section.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    sections: BTreeMap<CatalogSection, Vec<CatalogEntry>>,
}

impl ResourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every `*.json` file of every section under `config_dir`.
    /// Missing section directories are empty.
    pub fn load(config_dir: &Path) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for section in CatalogSection::ALL {
            let dir = config_dir.join(section.directory());
            let reader = match fs::read_dir(&dir) {
                Ok(reader) => reader,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => return Err(CatalogError::Io { path: dir, source }),
            };

            for entry in reader {
                let entry = entry.map_err(|source| CatalogError::Io {
                    path: dir.clone(),
                    source,
                })?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let contents = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                    path: path.clone(),
                    source,
                })?;
                let payload: serde_json::Value =
                    serde_json::from_str(&contents).map_err(|e| CatalogError::Parse {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                if !payload.is_object() {
                    return Err(CatalogError::Parse {
                        path,
                        message: "top level must be an object".to_string(),
                    });
                }
                let file_name = entry.file_name().to_string_lossy().into_owned();
                catalog.insert(section, CatalogEntry::from_payload(section, file_name, payload));
            }
        }

        tracing::debug!(
            dir = %config_dir.display(),
            resources = catalog.len(),
            "Loaded resource catalog"
        );
        Ok(catalog)
    }

    /// Adds an entry, keeping the section sorted by file name.
    pub fn insert(&mut self, section: CatalogSection, entry: CatalogEntry) {
        let entries = self.sections.entry(section).or_default();
        let at = entries.partition_point(|e| e.file_name <= entry.file_name);
        entries.insert(at, entry);
    }

    /// Convenience for building catalogs in code.
    pub fn with(
        mut self,
        section: CatalogSection,
        file_name: &str,
        payload: serde_json::Value,
    ) -> Self {
        self.insert(section, CatalogEntry::from_payload(section, file_name, payload));
        self
    }

    pub fn entries(&self, section: CatalogSection) -> &[CatalogEntry] {
        self.sections
            .get(&section)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_load_sections() {
        let dir = tempdir().unwrap();
        let roles = dir.path().join("security/roles");
        fs::create_dir_all(&roles).unwrap();
        fs::write(roles.join("b-role.json"), r#"{"role-name": "hub-reader"}"#).unwrap();
        fs::write(roles.join("a-role.json"), r#"{"description": "no name"}"#).unwrap();
        fs::write(roles.join("notes.txt"), "ignored").unwrap();

        let dbs = dir.path().join("databases");
        fs::create_dir_all(&dbs).unwrap();
        fs::write(dbs.join("final.json"), r#"{"database-name": "data-hub-FINAL"}"#).unwrap();

        let catalog = ResourceCatalog::load(dir.path()).unwrap();
        let roles = catalog.entries(CatalogSection::Roles);
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].id, "a-role");
        assert_eq!(roles[1].id, "hub-reader");
        assert_eq!(catalog.entries(CatalogSection::Databases)[0].id, "data-hub-FINAL");
        assert!(catalog.entries(CatalogSection::Servers).is_empty());
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_non_object_file_fails() {
        let dir = tempdir().unwrap();
        let servers = dir.path().join("servers");
        fs::create_dir_all(&servers).unwrap();
        fs::write(servers.join("bad.json"), "[1, 2]").unwrap();

        assert!(matches!(
            ResourceCatalog::load(dir.path()),
            Err(CatalogError::Parse { .. })
        ));
    }

    #[test]
    fn test_insert_keeps_file_order() {
        let catalog = ResourceCatalog::new()
            .with(CatalogSection::Amps, "z.json", json!({"local-name": "z"}))
            .with(CatalogSection::Amps, "a.json", json!({"local-name": "a"}));
        let ids: Vec<_> = catalog
            .entries(CatalogSection::Amps)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "z"]);
    }
}
