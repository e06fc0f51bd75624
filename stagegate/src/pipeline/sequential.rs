//! The sequential executor: a fixed, linearly ordered stage chain.
//!
//! Strictly serial: stage *i+1* never starts until stage *i*'s result is
//! accepted into the context. Any terminal stage failure fails the whole
//! run immediately; no partial pipeline is ever surfaced as done.

use crate::cancellation::CancellationToken;
use crate::context::{Context, RunIdentity};
use crate::contract::StageSpec;
use crate::core::StageStatus;
use crate::errors::PipelineError;
use crate::generate::Generator;
use crate::pipeline::{RunRecord, StageExecution};
use crate::retry::{RetryController, StageFailure};
use crate::validate::ValidationEngine;
use std::sync::Arc;
use tracing::{error, info};

/// Runs stages one after another, threading the context stage by stage.
#[derive(Debug, Clone)]
pub struct SequentialExecutor {
    controller: RetryController,
    engine: ValidationEngine,
}

impl SequentialExecutor {
    /// Creates a sequential executor.
    #[must_use]
    pub fn new(controller: RetryController) -> Self {
        Self {
            controller,
            engine: ValidationEngine::new(),
        }
    }

    /// Executes the chain in the given order.
    ///
    /// # Errors
    ///
    /// Fails fast with the first stage's terminal error; later stages are
    /// never invoked.
    pub async fn execute(
        &self,
        stages: &[(StageSpec, Arc<dyn Generator>)],
        requirement: &str,
    ) -> Result<RunRecord, PipelineError> {
        let identity = RunIdentity::new();
        let context = Context::new();
        let cancel = CancellationToken::new();
        let mut executions = Vec::with_capacity(stages.len());

        for (spec, generator) in stages {
            info!(stage = %spec.name, run_id = %identity.run_id, "stage running");

            let attempt = self
                .controller
                .execute(
                    spec,
                    generator.as_ref(),
                    &self.engine,
                    requirement,
                    &context,
                    None,
                    &cancel,
                )
                .await;

            match attempt {
                Ok(acceptance) => {
                    context.accept(&spec.name, acceptance.result)?;
                    info!(
                        stage = %spec.name,
                        attempts = acceptance.attempts,
                        "stage validated"
                    );
                    executions.push(StageExecution {
                        stage: spec.name.clone(),
                        phase: spec.phase,
                        status: StageStatus::Validated,
                        attempts: acceptance.attempts,
                        outcomes: acceptance.outcomes,
                    });
                }
                Err(StageFailure::Exhausted(err)) => {
                    error!(stage = %spec.name, "stage exhausted validation retries");
                    cancel.cancel(format!("stage '{}' failed", spec.name));
                    return Err(err.into());
                }
                Err(StageFailure::Unavailable(err)) => {
                    error!(stage = %spec.name, "stage collaborator unavailable");
                    cancel.cancel(format!("stage '{}' unavailable", spec.name));
                    return Err(err.into());
                }
                Err(StageFailure::Cancelled(reason)) => {
                    return Err(PipelineError::Internal(format!(
                        "stage '{}' cancelled unexpectedly: {}",
                        spec.name, reason
                    )));
                }
            }
        }

        Ok(RunRecord {
            identity,
            requirement: requirement.to_string(),
            context,
            executions,
            skips: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ResultShape;
    use crate::core::StagePhase;
    use crate::errors::GenerationError;
    use crate::retry::{JitterStrategy, RetryConfig};
    use crate::testing::{findings_result, steps_result, ScriptedGenerator};
    use parking_lot::Mutex;

    fn executor() -> SequentialExecutor {
        SequentialExecutor::new(RetryController::new(
            RetryConfig::new().with_jitter(JitterStrategy::None),
        ))
    }

    fn chain() -> Vec<(StageSpec, Arc<ScriptedGenerator>)> {
        let happy = StageSpec::new("happy_path", StagePhase::HappyPath, ResultShape::steps(3));
        let business = StageSpec::new(
            "business",
            StagePhase::Exception,
            ResultShape::findings(5),
        )
        .with_dependency("happy_path");

        vec![
            (happy, Arc::new(ScriptedGenerator::new("happy_path"))),
            (business, Arc::new(ScriptedGenerator::new("business"))),
        ]
    }

    fn erased(
        stages: &[(StageSpec, Arc<ScriptedGenerator>)],
    ) -> Vec<(StageSpec, Arc<dyn Generator>)> {
        stages
            .iter()
            .map(|(spec, generator)| {
                (spec.clone(), generator.clone() as Arc<dyn Generator>)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_runs_stages_in_order_with_threaded_context() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let happy = StageSpec::new("happy_path", StagePhase::HappyPath, ResultShape::steps(3));
        let business = StageSpec::new(
            "business",
            StagePhase::Exception,
            ResultShape::findings(5),
        );

        let happy_gen = Arc::new(
            ScriptedGenerator::new("happy_path").with_invocation_log(log.clone()),
        );
        happy_gen.push_ok(steps_result(3));
        let business_gen = Arc::new(
            ScriptedGenerator::new("business").with_invocation_log(log.clone()),
        );
        business_gen.push_ok(findings_result(5));

        let stages: Vec<(StageSpec, Arc<dyn Generator>)> = vec![
            (happy, happy_gen.clone()),
            (business, business_gen.clone()),
        ];

        let record = executor().execute(&stages, "login system").await.unwrap();

        // Invocation order matches the chain order.
        assert_eq!(
            *log.lock(),
            vec!["happy_path".to_string(), "business".to_string()]
        );
        // The downstream stage saw the upstream accepted result.
        let request = &business_gen.recorded_requests()[0];
        assert!(request.context.get("happy_path").is_some());

        assert_eq!(
            record.context.stage_names(),
            vec!["happy_path".to_string(), "business".to_string()]
        );
        assert_eq!(record.executions.len(), 2);
    }

    #[tokio::test]
    async fn test_fail_fast_skips_downstream_stages() {
        let stages = chain();
        // happy_path keeps producing too few steps until exhaustion.
        for _ in 0..3 {
            stages[0].1.push_ok(steps_result(1));
        }
        stages[1].1.push_ok(findings_result(5));

        let err = executor()
            .execute(&erased(&stages), "login system")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Exhausted(_)));
        // The downstream generator was never invoked.
        assert_eq!(stages[1].1.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_collaborator_terminates_run() {
        let stages = chain();
        for _ in 0..3 {
            stages[0]
                .1
                .push_err(GenerationError::Collaborator("llm offline".to_string()));
        }

        let err = executor()
            .execute(&erased(&stages), "login system")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Unavailable(_)));
        assert_eq!(stages[1].1.call_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_history_is_preserved_in_record() {
        let stages = chain();
        stages[0].1.push_ok(steps_result(1)); // rejected
        stages[0].1.push_ok(steps_result(3)); // accepted
        stages[1].1.push_ok(findings_result(5));

        let record = executor()
            .execute(&erased(&stages), "login system")
            .await
            .unwrap();

        let happy = record.execution("happy_path").unwrap();
        assert_eq!(happy.attempts, 2);
        assert_eq!(happy.outcomes.len(), 2);
        assert!(!happy.outcomes[0].passed);
        assert!(happy.outcomes[1].passed);
    }
}
