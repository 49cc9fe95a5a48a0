//! Content store reached over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::error::ContentError;
use super::traits::ContentStore;
use crate::config::{AuthScheme, Credentials, Endpoint};
use crate::tracker::Namespace;

/// Talks to `{base}/content/{namespace}`:
///
/// - `PUT ?key=…` with the raw bytes stores an artifact
/// - `HEAD ?key=…` answers 200 or 404
/// - `DELETE` drops the namespace and may answer `{"deleted": n}`
pub struct HttpContentStore {
    client: Client,
    base_url: String,
    credentials: Credentials,
    auth: AuthScheme,
}

#[derive(Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    deleted: usize,
}

impl HttpContentStore {
    pub fn new(
        endpoint: &Endpoint,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ContentError> {
        let auth = endpoint.auth_scheme().map_err(ContentError::Settings)?;
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(endpoint.simple_ssl)
            .build()
            .map_err(|e| ContentError::Unavailable(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: endpoint.base_url(),
            credentials,
            auth,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        self.credentials.authorize(request, self.auth)
    }

    fn namespace_url(&self, namespace: &Namespace) -> String {
        format!(
            "{}/content/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(namespace.as_str())
        )
    }

    fn key_url(&self, namespace: &Namespace, key: &str) -> String {
        format!(
            "{}?key={}",
            self.namespace_url(namespace),
            urlencoding::encode(key)
        )
    }
}

fn transport_error(e: reqwest::Error) -> ContentError {
    if e.is_timeout() {
        ContentError::Unavailable(format!("timed out: {}", e))
    } else {
        ContentError::Unavailable(e.to_string())
    }
}

async fn body_excerpt(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    body.chars().take(200).collect()
}

#[async_trait]
impl ContentStore for HttpContentStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn put(&self, namespace: &Namespace, key: &str, bytes: &[u8]) -> Result<(), ContentError> {
        debug!(namespace = %namespace, key = key, size = bytes.len(), "PUT artifact");

        let response = self
            .authorized(self.client.put(self.key_url(namespace, key)))
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = format!("HTTP {}: {}", status, body_excerpt(response).await);
        if status.is_client_error() {
            Err(ContentError::Rejected {
                key: key.to_string(),
                message,
            })
        } else {
            Err(ContentError::Unavailable(message))
        }
    }

    async fn exists(&self, namespace: &Namespace, key: &str) -> Result<bool, ContentError> {
        let response = self
            .authorized(self.client.head(self.key_url(namespace, key)))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(ContentError::Unavailable(format!("HEAD {}: HTTP {}", key, status))),
        }
    }

    async fn delete_namespace(&self, namespace: &Namespace) -> Result<usize, ContentError> {
        let response = self
            .authorized(self.client.delete(self.namespace_url(namespace)))
            .send()
            .await
            .map_err(|e| ContentError::DeleteFailed {
                namespace: namespace.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(0);
        }
        if !status.is_success() {
            return Err(ContentError::DeleteFailed {
                namespace: namespace.to_string(),
                message: format!("HTTP {}: {}", status, body_excerpt(response).await),
            });
        }

        let body = response.text().await.unwrap_or_default();
        Ok(serde_json::from_str::<DeleteResponse>(&body)
            .map(|r| r.deleted)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> HttpContentStore {
        let endpoint = Endpoint {
            scheme: "https".to_string(),
            host: "hub.example.com".to_string(),
            port: 8010,
            simple_ssl: true,
            auth: "basic".to_string(),
        };
        let credentials = Credentials {
            username: "u".to_string(),
            password: "p".to_string(),
        };
        HttpContentStore::new(&endpoint, credentials, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_urls_are_encoded() {
        let store = store();
        assert_eq!(
            store.key_url(&Namespace::user_modules(), "/ext/my lib.xqy"),
            "https://hub.example.com:8010/content/user-modules?key=%2Fext%2Fmy%20lib.xqy"
        );
        assert_eq!(
            store.namespace_url(&Namespace::hub_modules()),
            "https://hub.example.com:8010/content/hub-modules"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        let endpoint = Endpoint {
            scheme: "http".to_string(),
            host: "127.0.0.1".to_string(),
            port: 1,
            simple_ssl: false,
            auth: "basic".to_string(),
        };
        let credentials = Credentials {
            username: "u".to_string(),
            password: "p".to_string(),
        };
        let store =
            HttpContentStore::new(&endpoint, credentials, Duration::from_secs(2)).unwrap();
        let err = store
            .put(&Namespace::user_modules(), "/a.xqy", b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Unavailable(_)));
    }

    #[test]
    fn test_unsupported_auth_scheme_is_refused() {
        let endpoint = Endpoint {
            scheme: "http".to_string(),
            host: "hub.example.com".to_string(),
            port: 8000,
            simple_ssl: false,
            auth: "digest".to_string(),
        };
        let credentials = Credentials {
            username: "u".to_string(),
            password: "p".to_string(),
        };
        let result = HttpContentStore::new(&endpoint, credentials, Duration::from_secs(5));
        assert!(matches!(result, Err(ContentError::Settings(ref m)) if m.contains("digest")));
    }
}
