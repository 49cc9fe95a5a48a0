//! Failure kinds surfaced by steps, pipelines and the orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::{ContentError, SyncError};
use crate::tracker::TrackerError;
use crate::transport::TransportError;

/// Deployment failure, classified by how the caller should react.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeployError {
    /// The remote refused a resource descriptor.
    #[error("configuration rejected for {resource}: {message}")]
    ConfigurationRejected { resource: String, message: String },

    /// Network failure, timeout or an unreadable artifact source. The caller
    /// may retry; nothing here does.
    #[error("transient transport failure: {message}")]
    TransientTransportFailure { message: String },

    /// One or more artifacts of a namespace could not be uploaded.
    #[error("artifact upload failed in {namespace}: {message}")]
    ArtifactUploadFailed { namespace: String, message: String },

    /// Change records of a namespace cannot be trusted.
    #[error("change tracker corrupt for {namespace}: {message}")]
    TrackerCorruption { namespace: String, message: String },

    /// A step needs a resource kind no earlier step deploys, or runs after
    /// a kind that depends on it.
    #[error("step {step} is out of order: {reason}")]
    OrderingViolation { step: String, reason: String },
}

impl DeployError {
    /// Fatal errors abort the enclosing pipeline.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ArtifactUploadFailed { .. })
    }

    /// Whether an operator re-run may succeed without changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientTransportFailure { .. })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::ConfigurationRejected { .. } => "configuration_rejected",
            Self::TransientTransportFailure { .. } => "transient_transport_failure",
            Self::ArtifactUploadFailed { .. } => "artifact_upload_failed",
            Self::TrackerCorruption { .. } => "tracker_corruption",
            Self::OrderingViolation { .. } => "ordering_violation",
        }
    }
}

impl From<TransportError> for DeployError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Rejected {
                resource,
                status,
                message,
            } => Self::ConfigurationRejected {
                resource,
                message: format!("HTTP {}: {}", status, message),
            },
            other if other.is_transient() => Self::TransientTransportFailure {
                message: other.to_string(),
            },
            other => Self::ConfigurationRejected {
                resource: "transport".to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<TrackerError> for DeployError {
    fn from(e: TrackerError) -> Self {
        match e {
            TrackerError::Corrupt { namespace, reason } => Self::TrackerCorruption {
                namespace,
                message: reason,
            },
            TrackerError::InvalidNamespace(ns) => Self::TrackerCorruption {
                message: format!("invalid namespace '{}'", ns),
                namespace: ns,
            },
            TrackerError::Backend(message) => Self::TrackerCorruption {
                namespace: "*".to_string(),
                message,
            },
        }
    }
}

impl From<SyncError> for DeployError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Tracker(e) => e.into(),
            SyncError::Source {
                namespace,
                source_name,
                error,
            } => Self::TransientTransportFailure {
                message: format!(
                    "artifact source for {} unavailable ({}): {}",
                    namespace, source_name, error
                ),
            },
            SyncError::RecordsNotCleared { namespace, error } => Self::TrackerCorruption {
                message: format!(
                    "records survived a deleted namespace ({}); clear it again before syncing",
                    error
                ),
                namespace,
            },
            SyncError::Store(ContentError::DeleteFailed { namespace, message }) => {
                Self::TransientTransportFailure {
                    message: format!("cannot delete {}: {}", namespace, message),
                }
            }
            SyncError::Store(e) => Self::TransientTransportFailure {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_upload_failures_are_non_fatal() {
        let upload = DeployError::ArtifactUploadFailed {
            namespace: "user-modules".into(),
            message: "1 failed".into(),
        };
        assert!(!upload.is_fatal());
        assert!(!upload.is_retryable());

        let transient = DeployError::TransientTransportFailure {
            message: "reset".into(),
        };
        assert!(transient.is_fatal());
        assert!(transient.is_retryable());

        let ordering = DeployError::OrderingViolation {
            step: "triggers".into(),
            reason: "requires databases, which is not deployed before it".into(),
        };
        assert!(ordering.is_fatal());
        assert!(!ordering.is_retryable());
    }

    #[test]
    fn test_transport_rejection_maps_to_configuration_rejected() {
        let err: DeployError = TransportError::Rejected {
            resource: "roles/admin".into(),
            status: 403,
            message: "forbidden".into(),
        }
        .into();
        assert_eq!(
            err,
            DeployError::ConfigurationRejected {
                resource: "roles/admin".into(),
                message: "HTTP 403: forbidden".into(),
            }
        );

        let err: DeployError = TransportError::Timeout("30s".into()).into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_tracker_corruption_keeps_namespace() {
        let err: DeployError = SyncError::Tracker(TrackerError::Corrupt {
            namespace: "hub-modules".into(),
            reason: "bad json".into(),
        })
        .into();
        assert!(
            matches!(err, DeployError::TrackerCorruption { ref namespace, .. } if namespace == "hub-modules")
        );
    }

    #[test]
    fn test_unlistable_source_is_fatal_and_retryable() {
        let err: DeployError = SyncError::Source {
            namespace: "user-modules".into(),
            source_name: "fs:/srv/ml-modules".into(),
            error: ContentError::SourceNotFound("/srv/ml-modules".into()),
        }
        .into();
        assert!(err.is_fatal());
        assert!(err.is_retryable());
        assert!(err.to_string().contains("user-modules"));
    }

    #[test]
    fn test_records_left_after_clear_map_to_tracker_corruption() {
        let err: DeployError = SyncError::RecordsNotCleared {
            namespace: "user-modules".into(),
            error: TrackerError::Backend("locked".into()),
        }
        .into();
        assert!(
            matches!(err, DeployError::TrackerCorruption { ref namespace, .. } if namespace == "user-modules")
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let err = DeployError::OrderingViolation {
            step: "triggers".into(),
            reason: "requires databases, which is not deployed before it".into(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "ordering_violation");
        assert_eq!(json["step"], "triggers");
    }
}
