//! Ordered step execution for one group context.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::context::GroupContext;
use super::kind::StepKind;
use super::outcome::{StepOutcome, StepRecord};
use super::services::DeployServices;
use super::step::DeploymentStep;
use crate::error::DeployError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Built,
    Running,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Apply,
    Retract,
}

/// Record of one pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub group: String,
    pub mode: RunMode,
    pub state: PipelineState,
    pub records: Vec<StepRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineRun {
    pub fn is_completed(&self) -> bool {
        self.state == PipelineState::Completed
    }

    /// The step that aborted the run.
    pub fn abort_cause(&self) -> Option<&StepRecord> {
        if self.state != PipelineState::Aborted {
            return None;
        }
        self.records.iter().rev().find(|r| r.outcome.is_fatal())
    }

    /// Every failed step, fatal or not.
    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.records.iter().filter(|r| r.outcome.is_failed())
    }

    pub fn applied_steps(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::Applied { .. }))
            .count()
    }
}

/// Checks that every step's requirements are deployed by an earlier step or
/// assumed deployed, and that steps appear in dependency order. Derived
/// steps may follow anything. Returns every kind deployed once the steps
/// have run.
pub fn validate_order(
    steps: &[DeploymentStep],
    assumed: &BTreeSet<StepKind>,
) -> Result<BTreeSet<StepKind>, DeployError> {
    let mut deployed = assumed.clone();
    let mut latest: Option<StepKind> = None;
    for step in steps {
        if let Some(missing) = step.requires().iter().find(|k| !deployed.contains(*k)) {
            return Err(DeployError::OrderingViolation {
                step: step.name(),
                reason: format!("requires {}, which is not deployed before it", missing),
            });
        }
        if !step.is_derived() {
            if let Some(later) = latest.filter(|later| step.kind() < *later) {
                return Err(DeployError::OrderingViolation {
                    step: step.name(),
                    reason: format!("{} must be deployed before {}", step.kind(), later),
                });
            }
            latest = latest.max(Some(step.kind()));
        }
        deployed.insert(step.kind());
    }
    Ok(deployed)
}

/// Collects steps for a context and validates their order.
pub struct PipelineBuilder {
    context: GroupContext,
    steps: Vec<DeploymentStep>,
    assumed: BTreeSet<StepKind>,
}

impl PipelineBuilder {
    pub fn new(context: GroupContext) -> Self {
        Self {
            context,
            steps: Vec::new(),
            assumed: BTreeSet::new(),
        }
    }

    /// Kinds deployed by an earlier pipeline of the same install.
    pub fn assume_deployed(mut self, kinds: impl IntoIterator<Item = StepKind>) -> Self {
        self.assumed.extend(kinds);
        self
    }

    pub fn step(mut self, step: DeploymentStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = DeploymentStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Finalises the step list. Fails with `OrderingViolation` when a step
    /// needs a kind nothing before it deploys or runs after a later kind.
    pub fn build(self) -> Result<DeploymentPipeline, DeployError> {
        let deployed = validate_order(&self.steps, &self.assumed)?;
        Ok(DeploymentPipeline {
            context: self.context,
            steps: self.steps,
            deployed,
            state: PipelineState::Built,
        })
    }
}

/// Ordered steps bound to one [`GroupContext`].
///
/// Steps run strictly in order. The first fatal failure aborts the run;
/// steps already applied are left in place.
pub struct DeploymentPipeline {
    context: GroupContext,
    steps: Vec<DeploymentStep>,
    deployed: BTreeSet<StepKind>,
    state: PipelineState,
}

impl DeploymentPipeline {
    pub fn context(&self) -> &GroupContext {
        &self.context
    }

    pub fn steps(&self) -> &[DeploymentStep] {
        &self.steps
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Kinds deployed once this pipeline completes, including assumed ones.
    pub fn deployed_kinds(&self) -> &BTreeSet<StepKind> {
        &self.deployed
    }

    /// Applies every step in order.
    pub async fn run(self, services: &DeployServices) -> PipelineRun {
        self.execute(services, RunMode::Apply).await
    }

    /// Retracts every step in reverse order.
    pub async fn retract(self, services: &DeployServices) -> PipelineRun {
        self.execute(services, RunMode::Retract).await
    }

    async fn execute(mut self, services: &DeployServices, mode: RunMode) -> PipelineRun {
        let started_at = Utc::now();
        self.state = PipelineState::Running;
        info!(
            group = %self.context.group_name,
            mode = ?mode,
            steps = self.steps.len(),
            allow_resource_creation = self.context.allow_resource_creation,
            "Pipeline started"
        );

        let ordered: Vec<&DeploymentStep> = match mode {
            RunMode::Apply => self.steps.iter().collect(),
            RunMode::Retract => self.steps.iter().rev().collect(),
        };

        let mut records = Vec::with_capacity(ordered.len());
        for step in ordered {
            debug!(group = %self.context.group_name, step = %step.name(), "Running step");
            let outcome = match mode {
                RunMode::Apply => step.apply(&self.context, services).await,
                RunMode::Retract => step.retract(&self.context, services).await,
            };

            let fatal = outcome.is_fatal();
            if let Some(error) = outcome.error() {
                warn!(
                    group = %self.context.group_name,
                    step = %step.name(),
                    error = %error,
                    fatal = fatal,
                    "Step failed"
                );
            }
            records.push(StepRecord {
                step: step.name(),
                kind: step.kind(),
                outcome,
            });

            if fatal {
                self.state = PipelineState::Aborted;
                break;
            }
        }

        if self.state == PipelineState::Running {
            self.state = PipelineState::Completed;
        }

        let run = PipelineRun {
            group: self.context.group_name.clone(),
            mode,
            state: self.state,
            records,
            started_at,
            finished_at: Utc::now(),
        };
        match run.state {
            PipelineState::Aborted => warn!(
                group = %run.group,
                steps_run = run.records.len(),
                "Pipeline aborted"
            ),
            _ => info!(
                group = %run.group,
                applied = run.applied_steps(),
                "Pipeline completed"
            ),
        }
        run
    }
}
