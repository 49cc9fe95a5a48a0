use serde::{Deserialize, Serialize};

use super::kind::StepKind;
use crate::error::DeployError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    /// `changes` counts descriptors sent or artifacts uploaded.
    Applied { changes: usize },
    Skipped { reason: String },
    Failed { error: DeployError },
}

impl StepOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// A failure that must stop the pipeline.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Failed { error } if error.is_fatal())
    }

    pub fn error(&self) -> Option<&DeployError> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// One step of a [`PipelineRun`](super::PipelineRun).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: String,
    pub kind: StepKind,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}
