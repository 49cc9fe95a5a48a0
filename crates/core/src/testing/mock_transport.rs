//! Mock transport for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::transport::{ResourceDescriptor, ResourceKind, Transport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Configure,
    Retract,
}

/// A recorded transport call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub call: CallKind,
    pub descriptor: ResourceDescriptor,
    /// Whether the call succeeded.
    pub success: bool,
}

/// Mock implementation of the Transport trait.
///
/// Records every call in order and fails on demand:
/// - `fail_resource` rejects every call for one resource
/// - `set_next_error` fails the next call only
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    failing: Arc<RwLock<HashMap<(ResourceKind, String), TransportError>>>,
    next_error: Arc<RwLock<Option<TransportError>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    pub async fn clear_recorded_calls(&self) {
        self.calls.write().await.clear();
    }

    /// Successfully configured descriptors, in call order.
    pub async fn configured(&self) -> Vec<ResourceDescriptor> {
        self.filtered(CallKind::Configure).await
    }

    /// Successfully retracted descriptors, in call order.
    pub async fn retracted(&self) -> Vec<ResourceDescriptor> {
        self.filtered(CallKind::Retract).await
    }

    /// Successfully configured descriptors scoped to a group.
    pub async fn configured_in_group(&self, group: &str) -> Vec<ResourceDescriptor> {
        self.configured()
            .await
            .into_iter()
            .filter(|d| d.group.as_deref() == Some(group))
            .collect()
    }

    async fn filtered(&self, call: CallKind) -> Vec<ResourceDescriptor> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.call == call && c.success)
            .map(|c| c.descriptor.clone())
            .collect()
    }

    /// Reject every call for the given resource.
    pub async fn fail_resource(&self, kind: ResourceKind, id: &str) {
        self.failing.write().await.insert(
            (kind, id.to_string()),
            TransportError::Rejected {
                resource: format!("{}/{}", kind, id),
                status: 400,
                message: "rejected by mock".to_string(),
            },
        );
    }

    /// Fail every call for the given resource with a specific error.
    pub async fn fail_resource_with(&self, kind: ResourceKind, id: &str, error: TransportError) {
        self.failing.write().await.insert((kind, id.to_string()), error);
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: TransportError) {
        *self.next_error.write().await = Some(error);
    }

    async fn handle(&self, call: CallKind, descriptor: &ResourceDescriptor) -> Result<(), TransportError> {
        let result = match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => match self
                .failing
                .read()
                .await
                .get(&(descriptor.kind, descriptor.id.clone()))
            {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            },
        };

        self.calls.write().await.push(RecordedCall {
            call,
            descriptor: descriptor.clone(),
            success: result.is_ok(),
        });
        result
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn configure(&self, descriptor: &ResourceDescriptor) -> Result<(), TransportError> {
        self.handle(CallKind::Configure, descriptor).await
    }

    async fn retract(&self, descriptor: &ResourceDescriptor) -> Result<(), TransportError> {
        self.handle(CallKind::Retract, descriptor).await
    }
}
