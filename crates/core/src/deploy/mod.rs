//! Deployment steps and the pipeline that runs them.
//!
//! # Architecture
//!
//! ```text
//! PipelineBuilder(GroupContext)
//!     .step(Privileges).step(Roles{..}).step(Databases) ...
//!     .build()            ──► OrderingViolation if a step's requirement
//!                             is not deployed by an earlier step, or a
//!                             step follows a kind that depends on it
//! DeploymentPipeline::run(&DeployServices)
//!     Built ─► Running ─► Completed
//!                    └──► Aborted (first fatal failure, no rollback)
//! ```
//!
//! Steps reach the remote through [`DeployServices`]: the
//! [`Transport`](crate::transport::Transport) for resource descriptors and the
//! [`ContentSynchronizer`](crate::content::ContentSynchronizer) for modules.

mod catalog;
mod context;
mod filter;
mod kind;
mod outcome;
mod permissions;
mod pipeline;
mod services;
mod step;
mod version;

pub use catalog::{CatalogEntry, CatalogError, CatalogSection, ResourceCatalog};
pub use context::GroupContext;
pub use filter::ExcludePattern;
pub use kind::StepKind;
pub use outcome::{StepOutcome, StepRecord};
pub use permissions::ModulePermission;
pub use pipeline::{
    validate_order, DeploymentPipeline, PipelineBuilder, PipelineRun, PipelineState, RunMode,
};
pub use services::DeployServices;
pub use step::DeploymentStep;
pub use version::{ServerVersion, VersionError};
