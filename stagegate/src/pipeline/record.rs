//! Artifacts of a completed executor run, consumed by the quality gate.

use crate::context::{Context, RunIdentity};
use crate::core::{StagePhase, StageStatus, ValidationOutcome};
use serde::{Deserialize, Serialize};

/// How one stage fared across all of its attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageExecution {
    /// The stage name.
    pub stage: String,
    /// The stage's phase.
    pub phase: StagePhase,
    /// Terminal status of the stage.
    pub status: StageStatus,
    /// Validation attempts consumed.
    pub attempts: usize,
    /// Every validation outcome in attempt order; the accepted one last.
    pub outcomes: Vec<ValidationOutcome>,
}

impl StageExecution {
    /// Whether the stage's final validation outcome passed.
    #[must_use]
    pub fn final_outcome_passed(&self) -> bool {
        self.outcomes.last().is_some_and(|outcome| outcome.passed)
    }

    /// Flattens every rejection reason across all attempts, in order.
    #[must_use]
    pub fn all_reasons(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .flat_map(|outcome| outcome.reasons.iter().cloned())
            .collect()
    }
}

/// A coordinator decision to permanently skip a stage. Advisory, never
/// silent: every skip is surfaced in the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipAdvisory {
    /// The skipped stage.
    pub stage: String,
    /// Why the coordinator skipped it.
    pub reason: String,
}

impl SkipAdvisory {
    /// Creates a new skip advisory.
    #[must_use]
    pub fn new(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

/// Everything an executor hands to the quality gate after a completed run.
#[derive(Debug, Clone)]
pub struct RunRecord {
    /// Identity of the run.
    pub identity: RunIdentity,
    /// The requirement text that drove the run.
    pub requirement: String,
    /// Accepted results, in acceptance order.
    pub context: Context,
    /// Per-stage execution records, in completion order.
    pub executions: Vec<StageExecution>,
    /// Coordinator skip decisions.
    pub skips: Vec<SkipAdvisory>,
}

impl RunRecord {
    /// Looks up a stage's execution record.
    #[must_use]
    pub fn execution(&self, stage: &str) -> Option<&StageExecution> {
        self.executions.iter().find(|e| e.stage == stage)
    }
}
