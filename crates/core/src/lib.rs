pub mod config;
pub mod content;
pub mod deploy;
pub mod error;
pub mod orchestrator;
pub mod testing;
pub mod tracker;
pub mod transport;

pub use config::{
    load_config, load_config_from_str, validate_config, ConfigError, ConnectionProfile,
    Credentials, EnvironmentProperties, InstallConfig, TrackerBackendKind,
};
pub use content::{
    ArtifactSource, ClearReport, ContentStore, ContentSynchronizer, FsArtifactSource,
    FsContentStore, HttpContentStore, SyncConfig, SyncError, SyncReport,
};
pub use deploy::{
    DeployServices, DeploymentPipeline, DeploymentStep, GroupContext, PipelineBuilder,
    PipelineRun, PipelineState, ResourceCatalog, StepKind, StepOutcome,
};
pub use error::DeployError;
pub use orchestrator::{
    EnvironmentConfig, InstallOrchestrator, InstallReport, OrchestratorError, UninstallReport,
};
pub use tracker::{
    ChangeTracker, FileTrackerBackend, Namespace, PersistenceBackend, SqliteTrackerBackend,
    TrackerError,
};
pub use transport::{HttpTransport, ResourceDescriptor, ResourceKind, Transport, TransportError};
