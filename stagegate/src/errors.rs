//! Error types for the stagegate orchestrator.
//!
//! Validation failures are not errors at this level; they are absorbed into
//! retries by the retry controller and only surface here as
//! [`StageExhaustedError`] once the retry bound is spent.

use crate::core::ValidationOutcome;
use std::time::Duration;
use thiserror::Error;

/// Failure of the external generation collaborator for one attempt.
///
/// These are distinct from validation failures: a `GenerationError` means the
/// collaborator itself produced nothing usable, so the attempt does not count
/// against the validation retry budget.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The collaborator reported a failure.
    #[error("generation failed: {0}")]
    Collaborator(String),

    /// The collaborator did not respond within the per-stage timeout.
    #[error("generation timed out after {0:?}")]
    TimedOut(Duration),

    /// The run was cancelled while the collaborator was in flight.
    #[error("generation cancelled: {0}")]
    Cancelled(String),
}

/// Error raised when a stage fails validation on every allowed attempt.
///
/// Carries the complete attempt history so callers can see how the output
/// drifted across retries, not just the final rejection.
#[derive(Debug, Clone, Error)]
#[error("stage '{stage}' exhausted validation retries after {} attempts", attempts.len())]
pub struct StageExhaustedError {
    /// The stage that was exhausted.
    pub stage: String,
    /// Every validation outcome, in attempt order.
    pub attempts: Vec<ValidationOutcome>,
}

impl StageExhaustedError {
    /// Creates a new exhaustion error.
    #[must_use]
    pub fn new(stage: impl Into<String>, attempts: Vec<ValidationOutcome>) -> Self {
        Self {
            stage: stage.into(),
            attempts,
        }
    }

    /// Flattens every rejection reason across all attempts, in order.
    #[must_use]
    pub fn all_reasons(&self) -> Vec<String> {
        self.attempts
            .iter()
            .flat_map(|outcome| outcome.reasons.iter().cloned())
            .collect()
    }
}

/// Error raised when the generation collaborator itself keeps failing.
#[derive(Debug, Clone, Error)]
#[error("stage '{stage}' unavailable after {attempts} generation attempts: {last_error}")]
pub struct StageUnavailableError {
    /// The stage whose collaborator is broken.
    pub stage: String,
    /// How many generation attempts were made.
    pub attempts: usize,
    /// The final generation error.
    #[source]
    pub last_error: GenerationError,
}

impl StageUnavailableError {
    /// Creates a new unavailability error.
    #[must_use]
    pub fn new(stage: impl Into<String>, attempts: usize, last_error: GenerationError) -> Self {
        Self {
            stage: stage.into(),
            attempts,
            last_error,
        }
    }
}

/// Error raised when scheduling stalls with stages still pending.
///
/// Always a configuration or delegation-policy bug, never retried.
#[derive(Debug, Clone, Error)]
#[error("pipeline deadlocked; unsatisfiable stages: {}", pending.join(", "))]
pub struct PipelineDeadlockError {
    /// Stages left pending with unsatisfied dependencies.
    pub pending: Vec<String>,
}

impl PipelineDeadlockError {
    /// Creates a new deadlock error.
    #[must_use]
    pub fn new(pending: Vec<String>) -> Self {
        Self { pending }
    }
}

/// Error raised on an attempt to overwrite an accepted context entry.
#[derive(Debug, Clone, Error)]
#[error("context already holds an accepted result for stage '{stage}'")]
pub struct ContextConflictError {
    /// The stage whose entry already exists.
    pub stage: String,
}

impl ContextConflictError {
    /// Creates a new conflict error.
    #[must_use]
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
        }
    }
}

/// Error raised when pipeline construction fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineBuildError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl PipelineBuildError {
    /// Creates a new build error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}

/// The umbrella error type for a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage failed validation on every allowed attempt.
    #[error("{0}")]
    Exhausted(#[from] StageExhaustedError),

    /// A stage's generation collaborator is broken.
    #[error("{0}")]
    Unavailable(#[from] StageUnavailableError),

    /// The dependency graph cannot make progress.
    #[error("{0}")]
    Deadlock(#[from] PipelineDeadlockError),

    /// An accepted result was written twice for the same stage.
    #[error("{0}")]
    ContextConflict(#[from] ContextConflictError),

    /// Pipeline construction was invalid.
    #[error("{0}")]
    Build(#[from] PipelineBuildError),

    /// A stage task could not be joined.
    #[error("internal error: {0}")]
    Internal(String),
}
