//! Per-install environment configuration.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::{
    keys, ConnectionConfig, ConnectionProfile, EnvironmentProperties, InstallConfig,
    InstallSettings,
};

/// Everything an install needs to know about its target environment.
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentConfig {
    pub connection: ConnectionConfig,
    pub install: InstallSettings,
    /// Caller-supplied properties, layered over the environment defaults.
    pub overrides: BTreeMap<String, String>,
}

impl EnvironmentConfig {
    /// Combines the config file's `[properties]` with command-line
    /// overrides. Command-line values win.
    pub fn from_config(config: &InstallConfig, cli_overrides: &BTreeMap<String, String>) -> Self {
        let mut overrides = config.properties.clone();
        overrides.extend(cli_overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self {
            connection: config.connection.clone(),
            install: config.install.clone(),
            overrides,
        }
    }

    /// Safe-by-default properties for the environment with the caller's
    /// overrides on top.
    pub fn properties(&self) -> EnvironmentProperties {
        let defaults = if self.install.provisioned {
            EnvironmentProperties::provisioned(self.install.disable_ssl)
        } else {
            EnvironmentProperties::standard()
        };
        defaults.layered(&self.overrides)
    }

    pub fn profile(&self) -> ConnectionProfile {
        ConnectionProfile::from_properties(&self.connection, &self.properties())
    }

    /// Whether the layered properties describe a provisioned environment.
    /// `install.provisioned` only picks the defaults; an override of
    /// `environment.provisioned` has the last word.
    pub fn is_provisioned(&self) -> bool {
        self.properties().get_bool(keys::PROVISIONED)
    }

    /// Provisioned environments allocate storage themselves.
    pub fn allow_resource_creation(&self) -> bool {
        !self.is_provisioned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn config() -> InstallConfig {
        load_config_from_str(
            r#"
[connection]
host = "hub.example.com"

[properties]
"app_services.port" = "8011"
"custom.flag" = "file"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_cli_overrides_beat_file_properties() {
        let mut cli = BTreeMap::new();
        cli.insert("custom.flag".to_string(), "cli".to_string());

        let env = EnvironmentConfig::from_config(&config(), &cli);
        let props = env.properties();
        assert_eq!(props.get("custom.flag"), Some("cli"));
        assert_eq!(props.get_u16(keys::APP_SERVICES_PORT), Some(8011));
        assert_eq!(props.get(keys::FLOW_DEVELOPER_ROLE), Some("flowDeveloper"));
    }

    #[test]
    fn test_provisioned_disallows_resource_creation() {
        let env = EnvironmentConfig::from_config(&config(), &BTreeMap::new());
        assert!(!env.allow_resource_creation());
        assert_eq!(env.profile().app_services.port, 8011);

        let mut standard = config();
        standard.install.provisioned = false;
        let env = EnvironmentConfig::from_config(&standard, &BTreeMap::new());
        assert!(env.allow_resource_creation());
        assert_eq!(env.properties().get(keys::PROVISIONED), None);
    }

    #[test]
    fn test_provisioned_property_override_decides_resource_creation() {
        let mut cli = BTreeMap::new();
        cli.insert(keys::PROVISIONED.to_string(), "false".to_string());
        let env = EnvironmentConfig::from_config(&config(), &cli);
        assert!(env.install.provisioned);
        assert!(!env.is_provisioned());
        assert!(env.allow_resource_creation());

        let mut standard = config();
        standard.install.provisioned = false;
        let mut cli = BTreeMap::new();
        cli.insert(keys::PROVISIONED.to_string(), "true".to_string());
        let env = EnvironmentConfig::from_config(&standard, &cli);
        assert!(!env.allow_resource_creation());
    }
}
