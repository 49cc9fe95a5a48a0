use super::{types::InstallConfig, ConfigError};
use crate::deploy::{ExcludePattern, ServerVersion};
use crate::tracker::Namespace;

/// Validate configuration
/// Currently validates:
/// - Connection section exists (enforced by serde)
/// - Host is set and ports are not 0
/// - Group names are non-empty and distinct, also as namespace names
/// - Server version and role exclusion pattern parse
/// - At least one upload may run at a time
pub fn validate_config(config: &InstallConfig) -> Result<(), ConfigError> {
    if config.connection.host.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "connection.host cannot be empty".to_string(),
        ));
    }

    if config.connection.manage_port == 0 || config.connection.app_services_port == 0 {
        return Err(ConfigError::ValidationError(
            "connection ports cannot be 0".to_string(),
        ));
    }

    let install = &config.install;
    if install.evaluator_group.trim().is_empty() || install.curator_group.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "install group names cannot be empty".to_string(),
        ));
    }
    if install.evaluator_group == install.curator_group {
        return Err(ConfigError::ValidationError(format!(
            "evaluator and curator groups must differ (both are '{}')",
            install.evaluator_group
        )));
    }
    // Each group keeps its query options in its own namespace.
    let evaluator_ns = Namespace::query_options(&install.evaluator_group);
    if evaluator_ns == Namespace::query_options(&install.curator_group) {
        return Err(ConfigError::ValidationError(format!(
            "groups '{}' and '{}' would share the query options namespace {}",
            install.evaluator_group, install.curator_group, evaluator_ns
        )));
    }

    install
        .server_version
        .parse::<ServerVersion>()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    if let Some(pattern) = &install.exclude_roles {
        ExcludePattern::new(pattern).map_err(|e| {
            ConfigError::ValidationError(format!("install.exclude_roles is invalid: {}", e))
        })?;
    }

    if install.max_parallel_uploads == 0 {
        return Err(ConfigError::ValidationError(
            "install.max_parallel_uploads must be at least 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn base_config() -> InstallConfig {
        load_config_from_str(
            r#"
[connection]
host = "localhost"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = base_config();
        config.connection.manage_port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_same_groups_fails() {
        let mut config = base_config();
        config.install.curator_group = config.install.evaluator_group.clone();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_validate_groups_sharing_a_namespace_fail() {
        let mut config = base_config();
        config.install.evaluator_group = "Evaluator".to_string();
        config.install.curator_group = "evaluator".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("query-options-evaluator"));

        config.install.evaluator_group = "a b".to_string();
        config.install.curator_group = "a-b".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_bad_server_version_fails() {
        let mut config = base_config();
        config.install.server_version = "latest".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_bad_exclude_pattern_fails() {
        let mut config = base_config();
        config.install.exclude_roles = Some("(unclosed".to_string());
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("exclude_roles"));
    }

    #[test]
    fn test_validate_zero_parallel_uploads_fails() {
        let mut config = base_config();
        config.install.max_parallel_uploads = 0;
        assert!(validate_config(&config).is_err());
    }
}
