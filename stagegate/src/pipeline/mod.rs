//! Pipeline assembly and the run entry point.

mod builder;
mod coordinator;
mod delegating;
mod record;
mod sequential;

#[cfg(test)]
mod integration_tests;

pub use builder::PipelineBuilder;
pub use coordinator::{
    Coordinator, GreedyCoordinator, ReviewCoordinator, ReviewDecision, ReviewPass,
};
pub use delegating::DelegatingExecutor;
pub use record::{RunRecord, SkipAdvisory, StageExecution};
pub use sequential::SequentialExecutor;

use crate::contract::StageSpec;
use crate::errors::PipelineError;
use crate::generate::Generator;
use crate::overlap::OverlapCheck;
use crate::quality::{QualityGate, QualityGateReport, QualityPolicy};
use crate::retry::{RetryConfig, RetryController};
use std::sync::Arc;
use tracing::info;

/// How a pipeline schedules its stages.
#[derive(Debug, Clone)]
pub enum PipelineMode {
    /// Fixed order, strictly one stage at a time.
    Sequential,
    /// Dynamic scheduling under a coordinator, with bounded parallelism.
    Delegating(Arc<dyn Coordinator>),
}

/// A fully assembled analysis pipeline.
///
/// The sole entry point for callers is [`Pipeline::run`]; everything else
/// (CLI, export, persistence) lives outside this crate and consumes only the
/// returned [`QualityGateReport`].
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    stages: Vec<(StageSpec, Arc<dyn Generator>)>,
    policy: QualityPolicy,
    mode: PipelineMode,
    overlap_check: Option<OverlapCheck>,
}

impl Pipeline {
    pub(crate) fn from_parts(
        name: String,
        stages: Vec<(StageSpec, Arc<dyn Generator>)>,
        policy: QualityPolicy,
        mode: PipelineMode,
        overlap_check: Option<OverlapCheck>,
    ) -> Self {
        Self {
            name,
            stages,
            policy,
            mode,
            overlap_check,
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Runs the pipeline for one requirement.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] when any stage fails terminally or the
    /// graph deadlocks; a report is only produced for completed runs.
    pub async fn run(&self, requirement: &str) -> Result<QualityGateReport, PipelineError> {
        info!(pipeline = %self.name, "pipeline run started");

        let mut config = RetryConfig::new().with_max_retries(self.policy.max_retries);
        if let Some(timeout) = self.policy.per_stage_timeout {
            config = config.with_per_stage_timeout(timeout);
        }
        let controller = RetryController::new(config);

        let record = match &self.mode {
            PipelineMode::Sequential => {
                SequentialExecutor::new(controller)
                    .execute(&self.stages, requirement)
                    .await?
            }
            PipelineMode::Delegating(coordinator) => {
                DelegatingExecutor::new(controller, coordinator.clone())
                    .execute(&self.stages, requirement)
                    .await?
            }
        };

        let mut gate = QualityGate::new(self.policy.clone());
        if let Some(check) = &self.overlap_check {
            gate = gate.with_overlap_check(check.clone());
        }

        let report = gate.evaluate(&record);
        info!(
            pipeline = %self.name,
            publishable = report.publishable,
            "pipeline run completed"
        );
        Ok(report)
    }
}
