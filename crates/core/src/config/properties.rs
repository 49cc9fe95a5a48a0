//! Environment properties and their safe-by-default values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known property keys.
pub mod keys {
    /// Storage is allocated by the hosting provider.
    pub const PROVISIONED: &str = "environment.provisioned";

    pub const MANAGE_SCHEME: &str = "manage.scheme";
    pub const MANAGE_AUTH: &str = "manage.auth";
    pub const MANAGE_SIMPLE_SSL: &str = "manage.simple_ssl";

    pub const APP_SERVICES_PORT: &str = "app_services.port";
    pub const APP_SERVICES_AUTH: &str = "app_services.auth";
    pub const APP_SERVICES_SIMPLE_SSL: &str = "app_services.simple_ssl";

    /// Provider-managed role names. Catalog roles with these ids are not
    /// deployed to a provisioned environment.
    pub const FLOW_DEVELOPER_ROLE: &str = "roles.flow_developer";
    pub const FLOW_OPERATOR_ROLE: &str = "roles.flow_operator";
    pub const MODULE_PERMISSIONS: &str = "modules.permissions";
}

const DEFAULT_MODULE_PERMISSIONS: &str =
    "rest-reader,read,rest-writer,update,rest-extension-user,execute";

const PROVISIONED_MODULE_PERMISSIONS: &str = "data-hub-module-reader,read,data-hub-module-reader,execute,data-hub-environment-manager,update,rest-extension-user,execute";

/// Flat key/value properties describing the target environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentProperties {
    values: BTreeMap<String, String>,
}

impl EnvironmentProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults for a self-managed environment.
    pub fn standard() -> Self {
        let mut props = Self::new();
        props.set(keys::MODULE_PERMISSIONS, DEFAULT_MODULE_PERMISSIONS);
        props
    }

    /// Defaults for a managed hosting environment. All connections are
    /// secured unless `disable_ssl` is set.
    pub fn provisioned(disable_ssl: bool) -> Self {
        let mut props = Self::new();
        props.set(keys::PROVISIONED, "true");
        props.set(keys::APP_SERVICES_PORT, "8010");

        props.set(keys::FLOW_DEVELOPER_ROLE, "flowDeveloper");
        props.set(keys::FLOW_OPERATOR_ROLE, "flowOperator");
        props.set(keys::MODULE_PERMISSIONS, PROVISIONED_MODULE_PERMISSIONS);

        props.set(keys::MANAGE_AUTH, "basic");
        props.set(keys::APP_SERVICES_AUTH, "basic");

        if disable_ssl {
            tracing::info!("Not setting default property values for secure connections");
        } else {
            props.apply_secure_connections();
        }
        props
    }

    fn apply_secure_connections(&mut self) {
        self.set(keys::MANAGE_SCHEME, "https");
        self.set(keys::MANAGE_SIMPLE_SSL, "true");
        self.set(keys::APP_SERVICES_SIMPLE_SSL, "true");
    }

    /// Returns these properties with `overrides` layered on top.
    /// Override values always win.
    pub fn layered<'a, I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (key, value) in overrides {
            self.values.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parses a boolean property; anything but "true" (case-insensitive) is false.
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_u16(&self, key: &str) -> Option<u16> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioned_defaults_are_secure() {
        let props = EnvironmentProperties::provisioned(false);
        assert!(props.get_bool(keys::PROVISIONED));
        assert_eq!(props.get_u16(keys::APP_SERVICES_PORT), Some(8010));
        assert_eq!(props.get(keys::MANAGE_SCHEME), Some("https"));
        assert!(props.get_bool(keys::MANAGE_SIMPLE_SSL));
        assert!(props.get_bool(keys::APP_SERVICES_SIMPLE_SSL));
        assert_eq!(props.get(keys::APP_SERVICES_AUTH), Some("basic"));
    }

    #[test]
    fn test_provisioned_without_ssl() {
        let props = EnvironmentProperties::provisioned(true);
        assert!(props.get_bool(keys::PROVISIONED));
        assert_eq!(props.get(keys::MANAGE_SCHEME), None);
        assert!(!props.get_bool(keys::APP_SERVICES_SIMPLE_SSL));
        assert_eq!(props.get(keys::APP_SERVICES_AUTH), Some("basic"));
    }

    #[test]
    fn test_caller_overrides_win() {
        let mut overrides = BTreeMap::new();
        overrides.insert(keys::APP_SERVICES_PORT.to_string(), "9010".to_string());
        overrides.insert("custom.key".to_string(), "value".to_string());

        let props = EnvironmentProperties::provisioned(false).layered(&overrides);
        assert_eq!(props.get_u16(keys::APP_SERVICES_PORT), Some(9010));
        assert_eq!(props.get("custom.key"), Some("value"));
        // untouched defaults survive
        assert_eq!(props.get(keys::FLOW_OPERATOR_ROLE), Some("flowOperator"));
    }

    #[test]
    fn test_get_bool_is_lenient() {
        let mut props = EnvironmentProperties::new();
        props.set("a", " TRUE ");
        props.set("b", "yes");
        assert!(props.get_bool("a"));
        assert!(!props.get_bool("b"));
        assert!(!props.get_bool("missing"));
    }
}
