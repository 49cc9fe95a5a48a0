//! Error types for the transport module.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The remote refused the descriptor.
    #[error("{resource} rejected (HTTP {status}): {message}")]
    Rejected {
        resource: String,
        status: u16,
        message: String,
    },

    /// The remote could not be reached or failed server-side.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// The transport cannot be set up as configured.
    #[error("invalid transport settings: {0}")]
    Settings(String),
}

impl TransportError {
    /// Whether repeating the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}
