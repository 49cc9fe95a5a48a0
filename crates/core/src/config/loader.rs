use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::InstallConfig, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// Nested keys are addressed with a double underscore, e.g.
/// `HUBDEPLOY_INSTALL__SERVER_VERSION=11.0.3`.
pub fn load_config(path: &Path) -> Result<InstallConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: InstallConfig = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("HUBDEPLOY_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<InstallConfig, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[connection]
host = "hub.example.com"

[install]
server_version = "10.0-6"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.connection.host, "hub.example.com");
        assert_eq!(config.install.server_version, "10.0-6");
    }

    #[test]
    fn test_load_config_from_str_missing_connection() {
        let toml = r#"
[install]
provisioned = false
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/hubdeploy.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[connection]
host = "127.0.0.1"
manage_port = 9002

[properties]
"modules.permissions" = "rest-reader,read"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.connection.manage_port, 9002);
        assert_eq!(config.connection.host, "127.0.0.1");
        assert_eq!(
            config.properties.get("modules.permissions").map(String::as_str),
            Some("rest-reader,read")
        );
    }
}
