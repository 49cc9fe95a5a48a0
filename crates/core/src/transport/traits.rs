//! Trait definitions for the transport module.

use async_trait::async_trait;

use super::error::TransportError;
use super::types::ResourceDescriptor;

/// Applies configuration changes to the target environment.
///
/// Both operations must be idempotent on the remote side: configuring an
/// unchanged descriptor twice changes nothing, and retracting a resource
/// that does not exist succeeds.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the name of this transport implementation.
    fn name(&self) -> &str;

    /// Creates or updates the resource.
    async fn configure(&self, descriptor: &ResourceDescriptor) -> Result<(), TransportError>;

    /// Removes the resource.
    async fn retract(&self, descriptor: &ResourceDescriptor) -> Result<(), TransportError>;
}
