//! Bounded retry-with-feedback around a single stage execution.
//!
//! The retry controller owns the loop that turns an unreliable collaborator
//! plus a strict validator into either one accepted result or a terminal
//! failure. Rejected attempts feed their validation reasons into the next
//! generation request as typed [`Feedback`]; collaborator failures (and
//! per-stage timeouts) run on a separate counter so a flaky generator cannot
//! eat the validation budget.

use crate::cancellation::CancellationToken;
use crate::context::Context;
use crate::contract::StageSpec;
use crate::core::{Feedback, StageResult, ValidationOutcome};
use crate::errors::{GenerationError, StageExhaustedError, StageUnavailableError};
use crate::generate::{GenerationRequest, Generator};
use crate::validate::ValidationEngine;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff strategy for spacing retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^attempt
    #[default]
    Exponential,
    /// delay = base * (attempt + 1)
    Linear,
    /// delay = base (constant)
    Constant,
}

/// Jitter strategy applied on top of the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter.
    None,
    /// Random from 0 to delay.
    #[default]
    Full,
    /// Half fixed, half random.
    Equal,
}

/// Configuration for the retry controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per bound (validation and generation each).
    pub max_retries: usize,
    /// Per-attempt timeout for the generation call.
    pub per_stage_timeout: Option<Duration>,
    /// Base delay between attempts in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            per_stage_timeout: None,
            base_delay_ms: 0,
            max_delay_ms: 30_000,
            backoff: BackoffStrategy::Exponential,
            jitter: JitterStrategy::Full,
        }
    }
}

impl RetryConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the per-attempt generation timeout.
    #[must_use]
    pub fn with_per_stage_timeout(mut self, timeout: Duration) -> Self {
        self.per_stage_timeout = Some(timeout);
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let base = self.base_delay_ms;
        let delay = match self.backoff {
            BackoffStrategy::Exponential => base
                .saturating_mul(2u64.saturating_pow(attempt as u32))
                .min(self.max_delay_ms),
            BackoffStrategy::Linear => base
                .saturating_mul(attempt as u64 + 1)
                .min(self.max_delay_ms),
            BackoffStrategy::Constant => base.min(self.max_delay_ms),
        };

        let jittered = match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };

        Duration::from_millis(jittered)
    }
}

/// Outcome of a successfully gated stage execution.
#[derive(Debug, Clone)]
pub struct StageAcceptance {
    /// The accepted result.
    pub result: StageResult,
    /// Every validation outcome, rejected attempts first, accepted last.
    pub outcomes: Vec<ValidationOutcome>,
    /// Number of validation attempts consumed.
    pub attempts: usize,
}

/// Terminal failure of a gated stage execution.
#[derive(Debug, Clone)]
pub enum StageFailure {
    /// Every validation attempt was rejected.
    Exhausted(StageExhaustedError),
    /// The collaborator itself kept failing.
    Unavailable(StageUnavailableError),
    /// The run was cancelled before the stage settled.
    Cancelled(String),
}

/// State for one stage invocation. Owned exclusively by the controller and
/// discarded once the stage is accepted or exhausted.
#[derive(Debug, Default)]
struct RetryState {
    validation_attempts: usize,
    generation_failures: usize,
    outcomes: Vec<ValidationOutcome>,
    feedback: Option<Feedback>,
}

/// Executes one stage to an accepted result or gives up.
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    config: RetryConfig,
}

impl RetryController {
    /// Creates a controller with the given configuration.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the controller's configuration.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Runs the generate-validate loop for one stage.
    ///
    /// `initial_feedback` seeds the first generation request; the delegating
    /// coordinator uses this to inject synthesized guidance on a reprompt
    /// pass.
    ///
    /// # Errors
    ///
    /// Returns [`StageFailure::Exhausted`] with the full attempt history when
    /// every allowed attempt fails validation, [`StageFailure::Unavailable`]
    /// when the collaborator keeps failing outright, and
    /// [`StageFailure::Cancelled`] when the run is cancelled mid-stage.
    pub async fn execute(
        &self,
        spec: &StageSpec,
        generator: &dyn Generator,
        engine: &ValidationEngine,
        requirement: &str,
        context: &Context,
        initial_feedback: Option<Feedback>,
        cancel: &CancellationToken,
    ) -> Result<StageAcceptance, StageFailure> {
        let mut state = RetryState {
            feedback: initial_feedback,
            ..RetryState::default()
        };

        loop {
            if cancel.is_cancelled() {
                return Err(StageFailure::Cancelled(
                    cancel.reason().unwrap_or_else(|| "cancelled".to_string()),
                ));
            }

            let mut request =
                GenerationRequest::new(requirement, &spec.name, context.snapshot());
            if let Some(feedback) = state.feedback.clone() {
                request = request.with_feedback(feedback);
            }

            let candidate = match self.invoke(generator, &request, cancel).await {
                Ok(candidate) => candidate,
                Err(GenerationError::Cancelled(reason)) => {
                    return Err(StageFailure::Cancelled(reason));
                }
                Err(err) => {
                    state.generation_failures += 1;
                    warn!(
                        stage = %spec.name,
                        failures = state.generation_failures,
                        error = %err,
                        "generation attempt failed"
                    );
                    if state.generation_failures >= self.config.max_retries {
                        return Err(StageFailure::Unavailable(StageUnavailableError::new(
                            &spec.name,
                            state.generation_failures,
                            err,
                        )));
                    }
                    continue;
                }
            };

            state.validation_attempts += 1;
            let outcome = engine.validate(spec, &candidate, Some(context));

            if outcome.passed {
                debug!(
                    stage = %spec.name,
                    attempts = state.validation_attempts,
                    "stage result accepted"
                );
                state.outcomes.push(outcome);
                return Ok(StageAcceptance {
                    result: candidate,
                    outcomes: state.outcomes,
                    attempts: state.validation_attempts,
                });
            }

            debug!(
                stage = %spec.name,
                attempt = state.validation_attempts,
                reasons = ?outcome.reasons,
                "stage result rejected"
            );

            state.feedback = Some(Feedback::from_outcome(state.validation_attempts, &outcome));
            state.outcomes.push(outcome);

            if state.validation_attempts >= self.config.max_retries {
                return Err(StageFailure::Exhausted(StageExhaustedError::new(
                    &spec.name,
                    state.outcomes,
                )));
            }

            let delay = self.config.delay_for(state.validation_attempts - 1);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Invokes the generator, racing the per-stage timeout and cancellation.
    async fn invoke(
        &self,
        generator: &dyn Generator,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<StageResult, GenerationError> {
        let generation = generator.generate(request);

        match self.config.per_stage_timeout {
            Some(limit) => {
                tokio::select! {
                    () = cancel.cancelled() => Err(GenerationError::Cancelled(
                        cancel.reason().unwrap_or_else(|| "cancelled".to_string()),
                    )),
                    outcome = tokio::time::timeout(limit, generation) => match outcome {
                        Ok(inner) => inner,
                        Err(_) => Err(GenerationError::TimedOut(limit)),
                    },
                }
            }
            None => {
                tokio::select! {
                    () = cancel.cancelled() => Err(GenerationError::Cancelled(
                        cancel.reason().unwrap_or_else(|| "cancelled".to_string()),
                    )),
                    outcome = generation => outcome,
                }
            }
        }
    }
}
