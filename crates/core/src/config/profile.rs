use serde::Serialize;
use std::time::Duration;

use super::properties::{keys, EnvironmentProperties};
use super::types::ConnectionConfig;

/// One HTTP endpoint of the target environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Accept any server certificate.
    pub simple_ssl: bool,
    /// Authentication scheme named by the environment properties.
    pub auth: String,
}

impl Endpoint {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// The scheme HTTP clients use for this endpoint. Schemes they cannot
    /// perform are an error rather than a silent fallback.
    pub fn auth_scheme(&self) -> Result<AuthScheme, String> {
        match self.auth.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(AuthScheme::Basic),
            "none" => Ok(AuthScheme::None),
            other => Err(format!(
                "unsupported authentication scheme '{}' for {}",
                other,
                self.base_url()
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    Basic,
    /// Send no credentials.
    None,
}

/// Resolved connection settings shared by every step of a group run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionProfile {
    pub manage: Endpoint,
    pub app_services: Endpoint,
    pub username: String,
    pub timeout_secs: u32,
}

impl ConnectionProfile {
    /// Derives endpoints from the connection config, letting layered
    /// environment properties decide scheme, SSL, auth and the
    /// app-services port. Auth defaults to basic.
    pub fn from_properties(connection: &ConnectionConfig, props: &EnvironmentProperties) -> Self {
        let manage = Endpoint {
            scheme: props.get(keys::MANAGE_SCHEME).unwrap_or("http").to_string(),
            host: connection.host.clone(),
            port: connection.manage_port,
            simple_ssl: props.get_bool(keys::MANAGE_SIMPLE_SSL),
            auth: props.get(keys::MANAGE_AUTH).unwrap_or("basic").to_string(),
        };

        let app_services_ssl = props.get_bool(keys::APP_SERVICES_SIMPLE_SSL);
        let app_services = Endpoint {
            scheme: if app_services_ssl { "https" } else { "http" }.to_string(),
            host: connection.host.clone(),
            port: props
                .get_u16(keys::APP_SERVICES_PORT)
                .unwrap_or(connection.app_services_port),
            simple_ssl: app_services_ssl,
            auth: props
                .get(keys::APP_SERVICES_AUTH)
                .unwrap_or("basic")
                .to_string(),
        };

        Self {
            manage,
            app_services,
            username: connection.username.clone(),
            timeout_secs: connection.timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_secs))
    }
}

/// Credentials for both endpoints. Kept out of `ConnectionProfile` so the
/// profile can be logged and reported.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn from_connection(connection: &ConnectionConfig) -> Self {
        Self {
            username: connection.username.clone(),
            password: connection.password.clone(),
        }
    }

    /// Attaches these credentials to a request as `scheme` requires.
    pub fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        scheme: AuthScheme,
    ) -> reqwest::RequestBuilder {
        match scheme {
            AuthScheme::Basic => request.basic_auth(&self.username, Some(&self.password)),
            AuthScheme::None => request,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
