use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstallConfig {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub install: InstallSettings,
    /// Caller-supplied environment properties, layered over the defaults.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Connection to the target environment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default = "default_manage_port")]
    pub manage_port: u16,
    #[serde(default = "default_app_services_port")]
    pub app_services_port: u16,
    /// Request timeout in seconds (default: 60)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_manage_port() -> u16 {
    8002
}

fn default_app_services_port() -> u16 {
    8000
}

fn default_timeout() -> u32 {
    60
}

/// Local project layout. Relative paths resolve against `root`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Resource descriptors (roles, databases, servers, ...)
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    #[serde(default = "default_hub_modules_dir")]
    pub hub_modules_dir: PathBuf,
    #[serde(default = "default_hub_artifacts_dir")]
    pub hub_artifacts_dir: PathBuf,
    #[serde(default = "default_user_modules_dir")]
    pub user_modules_dir: PathBuf,
    #[serde(default = "default_query_options_dir")]
    pub query_options_dir: PathBuf,
}

impl ProjectConfig {
    /// Resolves a project-relative path against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            config_dir: default_config_dir(),
            hub_modules_dir: default_hub_modules_dir(),
            hub_artifacts_dir: default_hub_artifacts_dir(),
            user_modules_dir: default_user_modules_dir(),
            query_options_dir: default_query_options_dir(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("hub-config")
}

fn default_hub_modules_dir() -> PathBuf {
    PathBuf::from("hub-modules")
}

fn default_hub_artifacts_dir() -> PathBuf {
    PathBuf::from("hub-artifacts")
}

fn default_user_modules_dir() -> PathBuf {
    PathBuf::from("ml-modules")
}

fn default_query_options_dir() -> PathBuf {
    PathBuf::from("query-options")
}

/// Change tracker persistence
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub backend: TrackerBackendKind,
    /// SQLite database file, or directory of namespace files for `file`.
    #[serde(default = "default_tracker_path")]
    pub path: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            backend: TrackerBackendKind::default(),
            path: default_tracker_path(),
        }
    }
}

fn default_tracker_path() -> PathBuf {
    PathBuf::from(".hubdeploy/tracker.db")
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackerBackendKind {
    #[default]
    Sqlite,
    File,
}

/// Install behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstallSettings {
    /// Target server software version, e.g. "10.0-4".
    #[serde(default = "default_server_version")]
    pub server_version: String,
    #[serde(default = "default_evaluator_group")]
    pub evaluator_group: String,
    #[serde(default = "default_curator_group")]
    pub curator_group: String,
    /// Managed/hosted target: storage is allocated by the provider and
    /// administrative roles are excluded.
    #[serde(default = "default_true")]
    pub provisioned: bool,
    #[serde(default)]
    pub disable_ssl: bool,
    /// Pattern over role file names/ids that must not be deployed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_roles: Option<String>,
    #[serde(default = "default_final_triggers_database")]
    pub final_triggers_database: String,
    #[serde(default = "default_staging_triggers_database")]
    pub staging_triggers_database: String,
    /// App server whose query options are copied into each group.
    #[serde(default = "default_app_server")]
    pub app_server: String,
    #[serde(default = "default_max_parallel_uploads")]
    pub max_parallel_uploads: usize,
    /// Re-upload tracked artifacts that are missing from the content store.
    #[serde(default)]
    pub verify_destination: bool,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            server_version: default_server_version(),
            evaluator_group: default_evaluator_group(),
            curator_group: default_curator_group(),
            provisioned: true,
            disable_ssl: false,
            exclude_roles: None,
            final_triggers_database: default_final_triggers_database(),
            staging_triggers_database: default_staging_triggers_database(),
            app_server: default_app_server(),
            max_parallel_uploads: default_max_parallel_uploads(),
            verify_destination: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_server_version() -> String {
    "10.0-4".to_string()
}

fn default_evaluator_group() -> String {
    "Evaluator".to_string()
}

fn default_curator_group() -> String {
    "Curator".to_string()
}

fn default_final_triggers_database() -> String {
    "data-hub-final-TRIGGERS".to_string()
}

fn default_staging_triggers_database() -> String {
    "data-hub-staging-TRIGGERS".to_string()
}

fn default_app_server() -> String {
    "data-hub-FINAL".to_string()
}

fn default_max_parallel_uploads() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[connection]
host = "localhost"
"#;
        let config: InstallConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.connection.username, "admin");
        assert_eq!(config.connection.manage_port, 8002);
        assert_eq!(config.connection.app_services_port, 8000);
        assert_eq!(config.install.evaluator_group, "Evaluator");
        assert_eq!(config.install.curator_group, "Curator");
        assert!(config.install.provisioned);
        assert_eq!(config.install.max_parallel_uploads, 4);
        assert_eq!(config.tracker.backend, TrackerBackendKind::Sqlite);
        assert!(config.properties.is_empty());
    }

    #[test]
    fn test_deserialize_missing_connection_fails() {
        let toml = r#"
[install]
provisioned = false
"#;
        let result: Result<InstallConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_file_tracker() {
        let toml = r#"
[connection]
host = "localhost"

[tracker]
backend = "file"
path = "/var/lib/hubdeploy"
"#;
        let config: InstallConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.tracker.backend, TrackerBackendKind::File);
        assert_eq!(config.tracker.path, PathBuf::from("/var/lib/hubdeploy"));
    }

    #[test]
    fn test_password_is_never_serialized() {
        let toml = r#"
[connection]
host = "localhost"
password = "s3cret"
"#;
        let config: InstallConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.connection.password, "s3cret");

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("s3cret"));
    }

    #[test]
    fn test_project_paths_resolve_against_root() {
        let project = ProjectConfig {
            root: PathBuf::from("/srv/hub"),
            ..ProjectConfig::default()
        };
        assert_eq!(
            project.resolve(&project.hub_modules_dir),
            PathBuf::from("/srv/hub/hub-modules")
        );
        assert_eq!(
            project.resolve(Path::new("/abs/options")),
            PathBuf::from("/abs/options")
        );
    }
}
