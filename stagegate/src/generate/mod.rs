//! The generation collaborator boundary.
//!
//! Generation is external to the orchestrator: an opaque, possibly slow,
//! possibly failing black box that turns a requirement plus accumulated
//! context into a candidate [`StageResult`]. The orchestrator may invoke it
//! repeatedly with the same inputs and assumes nothing about content
//! idempotence, only that validating the same candidate twice yields the
//! same verdict.

use crate::context::ContextSnapshot;
use crate::core::{Feedback, StageResult};
use crate::errors::GenerationError;
use async_trait::async_trait;
use std::fmt::Debug;

/// The input to one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// The requirement text driving the whole run.
    pub requirement: String,
    /// The stage being generated.
    pub stage: String,
    /// Accepted upstream results at the time of this attempt.
    pub context: ContextSnapshot,
    /// Feedback from the previous rejected attempt, if any.
    pub feedback: Option<Feedback>,
}

impl GenerationRequest {
    /// Creates a request with no feedback.
    #[must_use]
    pub fn new(
        requirement: impl Into<String>,
        stage: impl Into<String>,
        context: ContextSnapshot,
    ) -> Self {
        Self {
            requirement: requirement.into(),
            stage: stage.into(),
            context,
            feedback: None,
        }
    }

    /// Attaches feedback for a retry attempt.
    #[must_use]
    pub fn with_feedback(mut self, feedback: Feedback) -> Self {
        self.feedback = Some(feedback);
        self
    }
}

/// A generation collaborator for one or more stages.
#[async_trait]
pub trait Generator: Send + Sync + Debug {
    /// Produces a candidate result for the requested stage.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] when the collaborator cannot produce a
    /// candidate at all. Candidates that fail quality criteria are not
    /// errors here; the validation engine rejects them downstream.
    async fn generate(&self, request: &GenerationRequest) -> Result<StageResult, GenerationError>;
}

/// A generator backed by a synchronous closure.
///
/// Mostly useful in tests and small fixed pipelines.
pub struct FnGenerator<F>
where
    F: Fn(&GenerationRequest) -> Result<StageResult, GenerationError> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnGenerator<F>
where
    F: Fn(&GenerationRequest) -> Result<StageResult, GenerationError> + Send + Sync,
{
    /// Creates a new closure-backed generator.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnGenerator<F>
where
    F: Fn(&GenerationRequest) -> Result<StageResult, GenerationError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnGenerator").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Generator for FnGenerator<F>
where
    F: Fn(&GenerationRequest) -> Result<StageResult, GenerationError> + Send + Sync,
{
    async fn generate(&self, request: &GenerationRequest) -> Result<StageResult, GenerationError> {
        (self.func)(request)
    }
}
