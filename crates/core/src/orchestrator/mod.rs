//! Install orchestrator.
//!
//! Drives a whole install: layers environment defaults under caller
//! overrides, builds the whitelisted step list and runs it once per server
//! group, one group after the other:
//! - **Evaluator**: every application resource, modules and derived data
//! - **Curator**: server topology only, reusing what the evaluator deployed

mod config;
mod runner;
mod types;
mod whitelist;

pub use config::EnvironmentConfig;
pub use runner::InstallOrchestrator;
pub use types::{ContextFailure, InstallReport, OrchestratorError, UninstallReport};
pub use whitelist::{curator_steps, evaluator_steps};
