//! Types for the install orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::content::SyncError;
use crate::deploy::{PipelineRun, RunMode};
use crate::error::DeployError;

/// Errors that prevent an install from starting.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The step list is invalid.
    #[error("invalid install plan: {0}")]
    Plan(#[from] DeployError),

    /// Install settings or properties cannot be turned into steps.
    #[error("invalid install settings: {0}")]
    Settings(String),

    #[error("no artifact source registered for namespace {0}")]
    UnknownNamespace(String),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Where an install stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFailure {
    pub group: String,
    pub step: String,
    pub error: DeployError,
}

/// Outcome of an install or uninstall across every group context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallReport {
    pub run_id: Uuid,
    pub mode: RunMode,
    /// False when a context aborted or any step failed.
    pub success: bool,
    /// One run per context that started, in execution order.
    pub runs: Vec<PipelineRun>,
    /// The failure that aborted the install, if any.
    pub failure: Option<ContextFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Uninstalls report in the same shape, with `mode` set to `retract`.
pub type UninstallReport = InstallReport;

impl InstallReport {
    pub(crate) fn finish(
        run_id: Uuid,
        mode: RunMode,
        runs: Vec<PipelineRun>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let failure = runs.iter().find_map(|run| {
            run.abort_cause().and_then(|record| {
                record.outcome.error().map(|error| ContextFailure {
                    group: run.group.clone(),
                    step: record.step.clone(),
                    error: error.clone(),
                })
            })
        });
        let success = failure.is_none() && runs.iter().all(|r| r.failures().next().is_none());

        Self {
            run_id,
            mode,
            success,
            runs,
            failure,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Group names in the order their pipelines ran.
    pub fn groups(&self) -> Vec<&str> {
        self.runs.iter().map(|r| r.group.as_str()).collect()
    }
}
