//! HTTP management API transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use tracing::debug;

use super::error::TransportError;
use super::traits::Transport;
use super::types::ResourceDescriptor;
use crate::config::{AuthScheme, Credentials, Endpoint};

/// Sends descriptors to `{manage}/{collection}/{id}`.
///
/// Scoped resources use `{manage}/{collection}/{parent}/{id}` and grouped
/// resources pass `?group-id=`. `PUT` configures, `DELETE` retracts.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    credentials: Credentials,
    auth: AuthScheme,
}

impl HttpTransport {
    pub fn new(
        manage: &Endpoint,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let auth = manage.auth_scheme().map_err(TransportError::Settings)?;
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(manage.simple_ssl)
            .build()
            .map_err(|e| TransportError::Unavailable(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: manage.base_url(),
            credentials,
            auth,
        })
    }

    fn url_for(&self, descriptor: &ResourceDescriptor) -> String {
        let mut url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            descriptor.kind.collection()
        );
        if let Some(parent) = &descriptor.parent {
            url.push('/');
            url.push_str(&urlencoding::encode(parent));
        }
        url.push('/');
        url.push_str(&urlencoding::encode(&descriptor.id));
        if let Some(group) = &descriptor.group {
            url.push_str("?group-id=");
            url.push_str(&urlencoding::encode(group));
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        descriptor: &ResourceDescriptor,
    ) -> Result<StatusCode, TransportError> {
        let url = self.url_for(descriptor);
        debug!(method = %method, url = %url, "Management request");

        let mut request = self
            .credentials
            .authorize(self.client.request(method.clone(), &url), self.auth);
        if method == Method::PUT {
            request = request.json(&descriptor.payload);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else {
                TransportError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(status);
        }
        if method == Method::DELETE && status == StatusCode::NOT_FOUND {
            return Ok(status);
        }

        let body = response.text().await.unwrap_or_default();
        let message: String = body.chars().take(200).collect();
        if status.is_client_error() {
            Err(TransportError::Rejected {
                resource: descriptor.label(),
                status: status.as_u16(),
                message,
            })
        } else {
            Err(TransportError::Unavailable(format!(
                "HTTP {} for {}: {}",
                status,
                descriptor.label(),
                message
            )))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn configure(&self, descriptor: &ResourceDescriptor) -> Result<(), TransportError> {
        self.send(Method::PUT, descriptor).await.map(|_| ())
    }

    async fn retract(&self, descriptor: &ResourceDescriptor) -> Result<(), TransportError> {
        self.send(Method::DELETE, descriptor).await.map(|_| ())
    }
}
