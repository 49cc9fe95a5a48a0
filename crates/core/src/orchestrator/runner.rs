//! Install orchestrator implementation.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::config::EnvironmentConfig;
use super::types::{InstallReport, OrchestratorError, UninstallReport};
use super::whitelist::{curator_steps, evaluator_steps};
use crate::content::{ClearReport, SyncError, SyncReport};
use crate::deploy::{validate_order, DeployServices, GroupContext, PipelineBuilder, RunMode};
use crate::tracker::Namespace;

/// Runs installs and uninstalls against one set of collaborators.
pub struct InstallOrchestrator {
    services: DeployServices,
}

impl InstallOrchestrator {
    pub fn new(services: DeployServices) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &DeployServices {
        &self.services
    }

    /// Installs into the evaluator group, then the curator group.
    ///
    /// Both step lists are validated before anything is sent. The curator
    /// pipeline is only built once the evaluator pipeline has finished, and
    /// not at all if it aborted. Nothing is retried or rolled back.
    pub async fn run(&self, env: &EnvironmentConfig) -> Result<InstallReport, OrchestratorError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        check_group_namespaces(env)?;
        let props = env.properties();
        let evaluator = evaluator_steps(&env.install, &props)?;
        let curator = curator_steps(&env.install)?;

        let context = GroupContext::new(
            &env.install.evaluator_group,
            env.allow_resource_creation(),
            env.profile(),
        );
        let pipeline = PipelineBuilder::new(context.clone()).steps(evaluator).build()?;
        let deployed = pipeline.deployed_kinds().clone();
        validate_order(&curator, &deployed)?;

        info!(
            run_id = %run_id,
            provisioned = env.is_provisioned(),
            evaluator = %env.install.evaluator_group,
            curator = %env.install.curator_group,
            "Install started"
        );

        let mut runs = Vec::with_capacity(2);
        let evaluator_run = pipeline.run(&self.services).await;
        let evaluator_completed = evaluator_run.is_completed();
        runs.push(evaluator_run);

        if evaluator_completed {
            let pipeline = PipelineBuilder::new(context.for_group(&env.install.curator_group))
                .assume_deployed(deployed)
                .steps(curator)
                .build()?;
            runs.push(pipeline.run(&self.services).await);
        }

        let report = InstallReport::finish(run_id, RunMode::Apply, runs, started_at);
        log_finished(&report);
        Ok(report)
    }

    /// Retracts the curator group, then the evaluator group, each in reverse
    /// step order.
    pub async fn uninstall(
        &self,
        env: &EnvironmentConfig,
    ) -> Result<UninstallReport, OrchestratorError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        check_group_namespaces(env)?;
        let props = env.properties();
        let evaluator = evaluator_steps(&env.install, &props)?;
        let curator = curator_steps(&env.install)?;

        let context = GroupContext::new(
            &env.install.evaluator_group,
            env.allow_resource_creation(),
            env.profile(),
        );
        let evaluator_pipeline = PipelineBuilder::new(context.clone()).steps(evaluator).build()?;
        let deployed = evaluator_pipeline.deployed_kinds().clone();
        let curator_pipeline = PipelineBuilder::new(context.for_group(&env.install.curator_group))
            .assume_deployed(deployed)
            .steps(curator)
            .build()?;

        info!(run_id = %run_id, "Uninstall started");

        let mut runs = Vec::with_capacity(2);
        let curator_run = curator_pipeline.retract(&self.services).await;
        let curator_completed = curator_run.is_completed();
        runs.push(curator_run);

        if curator_completed {
            runs.push(evaluator_pipeline.retract(&self.services).await);
        }

        let report = InstallReport::finish(run_id, RunMode::Retract, runs, started_at);
        log_finished(&report);
        Ok(report)
    }

    /// Removes user modules from the content store and forgets their change
    /// records. Hub modules are untouched.
    pub async fn clear_user_modules(&self) -> Result<ClearReport, SyncError> {
        self.services
            .synchronizer
            .clear_namespace(&Namespace::user_modules())
            .await
    }

    /// Syncs one registered module namespace outside of a full install.
    pub async fn sync_namespace(&self, namespace: &Namespace) -> Result<SyncReport, OrchestratorError> {
        let source = self
            .services
            .module_sources
            .get(namespace)
            .ok_or_else(|| OrchestratorError::UnknownNamespace(namespace.to_string()))?;
        Ok(self.services.synchronizer.sync(namespace, source.as_ref()).await?)
    }
}

/// Two groups sharing a query options namespace would overwrite each
/// other's change records.
fn check_group_namespaces(env: &EnvironmentConfig) -> Result<(), OrchestratorError> {
    let evaluator = Namespace::query_options(&env.install.evaluator_group);
    if evaluator == Namespace::query_options(&env.install.curator_group) {
        return Err(OrchestratorError::Settings(format!(
            "groups '{}' and '{}' share the query options namespace {}",
            env.install.evaluator_group, env.install.curator_group, evaluator
        )));
    }
    Ok(())
}

fn log_finished(report: &InstallReport) {
    match &report.failure {
        Some(failure) => warn!(
            run_id = %report.run_id,
            group = %failure.group,
            step = %failure.step,
            error = %failure.error,
            retryable = failure.error.is_retryable(),
            "Install aborted"
        ),
        None => info!(
            run_id = %report.run_id,
            mode = ?report.mode,
            success = report.success,
            groups = ?report.groups(),
            "Install finished"
        ),
    }
}
