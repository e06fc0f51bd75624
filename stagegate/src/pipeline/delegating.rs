//! The delegating executor: dynamic scheduling over a dependency graph.
//!
//! Order is not fixed at construction time. At each scheduling point the
//! executor computes the ready set (all dependencies validated, stage still
//! pending), asks the coordinator which ready stages to dispatch, and runs
//! the selected stages concurrently. A synchronization barrier waits for
//! every dispatched stage to settle before the ready set is re-evaluated, so
//! context writes never race. The sequential executor is the degenerate
//! case of this one with a total order encoded as a dependency chain.

use crate::cancellation::CancellationToken;
use crate::context::{Context, RunIdentity};
use crate::contract::StageSpec;
use crate::core::StageStatus;
use crate::errors::{PipelineDeadlockError, PipelineError, StageExhaustedError};
use crate::generate::Generator;
use crate::pipeline::{
    Coordinator, ReviewDecision, ReviewPass, RunRecord, SkipAdvisory, StageExecution,
};
use crate::retry::{RetryController, StageAcceptance, StageFailure};
use crate::validate::ValidationEngine;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

type StageSettlement = (String, Result<StageAcceptance, StageFailure>);

/// Runs an open set of stages under a coordinating policy.
#[derive(Debug, Clone)]
pub struct DelegatingExecutor {
    controller: RetryController,
    engine: ValidationEngine,
    coordinator: Arc<dyn Coordinator>,
}

impl DelegatingExecutor {
    /// Creates a delegating executor with the given coordination policy.
    #[must_use]
    pub fn new(controller: RetryController, coordinator: Arc<dyn Coordinator>) -> Self {
        Self {
            controller,
            engine: ValidationEngine::new(),
            coordinator,
        }
    }

    /// Executes all stages to completion, skip, or failure.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineDeadlockError`] when pending stages can never become
    /// ready, and propagates terminal stage failures the coordinator did not
    /// absorb. Any failure cancels still-running stage invocations before
    /// returning.
    pub async fn execute(
        &self,
        stages: &[(StageSpec, Arc<dyn Generator>)],
        requirement: &str,
    ) -> Result<RunRecord, PipelineError> {
        let identity = RunIdentity::new();
        let context = Context::new();
        let cancel = Arc::new(CancellationToken::new());

        let mut statuses: HashMap<String, StageStatus> = stages
            .iter()
            .map(|(spec, _)| (spec.name.clone(), StageStatus::Pending))
            .collect();
        let mut executions: Vec<StageExecution> = Vec::new();
        let mut skips: Vec<SkipAdvisory> = Vec::new();

        loop {
            let ready: Vec<&StageSpec> = stages
                .iter()
                .map(|(spec, _)| spec)
                .filter(|spec| {
                    statuses.get(&spec.name) == Some(&StageStatus::Pending)
                        && spec.dependencies.iter().all(|dep| context.contains(dep))
                })
                .collect();

            if ready.is_empty() {
                let pending: Vec<&StageSpec> = stages
                    .iter()
                    .map(|(spec, _)| spec)
                    .filter(|spec| statuses.get(&spec.name) == Some(&StageStatus::Pending))
                    .collect();

                if pending.is_empty() {
                    break;
                }

                // A stage stranded only because a dependency was skipped is
                // itself skipped, with its own advisory; anything else left
                // pending is an unsatisfiable graph.
                let stranded: Vec<(String, String)> = pending
                    .iter()
                    .filter_map(|spec| {
                        spec.dependencies
                            .iter()
                            .find(|dep| statuses.get(*dep) == Some(&StageStatus::Skipped))
                            .map(|dep| (spec.name.clone(), dep.clone()))
                    })
                    .collect();

                if stranded.is_empty() {
                    let names: Vec<String> =
                        pending.iter().map(|spec| spec.name.clone()).collect();
                    cancel.cancel("pipeline deadlocked");
                    return Err(PipelineDeadlockError::new(names).into());
                }

                for (stage, dep) in stranded {
                    warn!(stage = %stage, dependency = %dep, "stage skipped: dependency was skipped");
                    statuses.insert(stage.clone(), StageStatus::Skipped);
                    skips.push(SkipAdvisory::new(
                        &stage,
                        format!("dependency '{}' was skipped", dep),
                    ));
                }
                continue;
            }

            let mut selected = self.coordinator.select(&ready, &context);
            selected.retain(|name| ready.iter().any(|spec| &spec.name == name));
            if selected.is_empty() {
                selected = ready.iter().map(|spec| spec.name.clone()).collect();
            }

            let mut in_flight: FuturesUnordered<JoinHandle<StageSettlement>> =
                FuturesUnordered::new();

            for name in &selected {
                statuses.insert(name.clone(), StageStatus::Running);
                info!(stage = %name, run_id = %identity.run_id, "stage dispatched");
                in_flight.push(self.spawn_stage(stages, name, requirement, &context, &cancel));
            }

            // Barrier: every dispatched stage settles before the ready set
            // is re-evaluated. A fatal settlement cancels the rest, which
            // then drain as cancelled.
            let mut exhausted: Vec<StageExhaustedError> = Vec::new();
            let mut fatal: Option<PipelineError> = None;

            while let Some(joined) = in_flight.next().await {
                let (name, settlement) = match joined {
                    Ok(pair) => pair,
                    Err(err) => {
                        if fatal.is_none() {
                            cancel.cancel("stage task panicked");
                            fatal = Some(PipelineError::Internal(format!(
                                "stage task join error: {}",
                                err
                            )));
                        }
                        continue;
                    }
                };

                if fatal.is_some() {
                    continue;
                }

                match settlement {
                    Ok(acceptance) => {
                        context.accept(&name, acceptance.result)?;
                        statuses.insert(name.clone(), StageStatus::Validated);
                        info!(stage = %name, attempts = acceptance.attempts, "stage validated");
                        executions.push(StageExecution {
                            stage: name.clone(),
                            phase: stage_spec(stages, &name).phase,
                            status: StageStatus::Validated,
                            attempts: acceptance.attempts,
                            outcomes: acceptance.outcomes,
                        });
                    }
                    Err(StageFailure::Exhausted(err)) => {
                        exhausted.push(err);
                    }
                    Err(StageFailure::Unavailable(err)) => {
                        error!(stage = %name, "stage collaborator unavailable");
                        cancel.cancel(format!("stage '{}' unavailable", name));
                        fatal = Some(err.into());
                    }
                    Err(StageFailure::Cancelled(_)) => {
                        // Drained after another stage's fatal settlement.
                    }
                }
            }

            if let Some(err) = fatal {
                return Err(err);
            }

            for err in exhausted {
                self.arbitrate(
                    stages,
                    err,
                    requirement,
                    &context,
                    &cancel,
                    &mut statuses,
                    &mut executions,
                    &mut skips,
                )
                .await?;
            }
        }

        Ok(RunRecord {
            identity,
            requirement: requirement.to_string(),
            context,
            executions,
            skips,
        })
    }

    /// Hands an exhausted stage to the coordinator and applies its decision.
    #[allow(clippy::too_many_arguments)]
    async fn arbitrate(
        &self,
        stages: &[(StageSpec, Arc<dyn Generator>)],
        err: StageExhaustedError,
        requirement: &str,
        context: &Context,
        cancel: &Arc<CancellationToken>,
        statuses: &mut HashMap<String, StageStatus>,
        executions: &mut Vec<StageExecution>,
        skips: &mut Vec<SkipAdvisory>,
    ) -> Result<(), PipelineError> {
        let spec = stage_spec(stages, &err.stage);
        let generator = stage_generator(stages, &err.stage);

        match self.coordinator.review(spec, &err.attempts, ReviewPass::First) {
            ReviewDecision::Reprompt(feedback) => {
                info!(stage = %spec.name, "coordinator requested reprompt pass");
                let second = self
                    .controller
                    .execute(
                        spec,
                        generator.as_ref(),
                        &self.engine,
                        requirement,
                        context,
                        Some(feedback),
                        cancel,
                    )
                    .await;

                match second {
                    Ok(acceptance) => {
                        context.accept(&spec.name, acceptance.result)?;
                        statuses.insert(spec.name.clone(), StageStatus::Validated);
                        let mut outcomes = err.attempts;
                        let attempts = outcomes.len() + acceptance.attempts;
                        outcomes.extend(acceptance.outcomes);
                        info!(stage = %spec.name, attempts, "stage validated after reprompt");
                        executions.push(StageExecution {
                            stage: spec.name.clone(),
                            phase: spec.phase,
                            status: StageStatus::Validated,
                            attempts,
                            outcomes,
                        });
                        Ok(())
                    }
                    Err(StageFailure::Exhausted(second_err)) => {
                        let mut combined = err.attempts;
                        combined.extend(second_err.attempts);
                        match self
                            .coordinator
                            .review(spec, &combined, ReviewPass::Reprompted)
                        {
                            ReviewDecision::Skip { reason } => {
                                self.record_skip(spec, reason, combined, statuses, executions, skips);
                                Ok(())
                            }
                            ReviewDecision::Reprompt(_) | ReviewDecision::Fail => {
                                cancel.cancel(format!("stage '{}' failed", spec.name));
                                Err(StageExhaustedError::new(&spec.name, combined).into())
                            }
                        }
                    }
                    Err(StageFailure::Unavailable(unavailable)) => {
                        cancel.cancel(format!("stage '{}' unavailable", spec.name));
                        Err(unavailable.into())
                    }
                    Err(StageFailure::Cancelled(reason)) => Err(PipelineError::Internal(
                        format!("reprompt of stage '{}' cancelled: {}", spec.name, reason),
                    )),
                }
            }
            ReviewDecision::Skip { reason } => {
                self.record_skip(spec, reason, err.attempts, statuses, executions, skips);
                Ok(())
            }
            ReviewDecision::Fail => {
                cancel.cancel(format!("stage '{}' failed", spec.name));
                Err(err.into())
            }
        }
    }

    fn record_skip(
        &self,
        spec: &StageSpec,
        reason: String,
        outcomes: Vec<crate::core::ValidationOutcome>,
        statuses: &mut HashMap<String, StageStatus>,
        executions: &mut Vec<StageExecution>,
        skips: &mut Vec<SkipAdvisory>,
    ) {
        warn!(stage = %spec.name, reason = %reason, "stage skipped by coordinator");
        statuses.insert(spec.name.clone(), StageStatus::Skipped);
        executions.push(StageExecution {
            stage: spec.name.clone(),
            phase: spec.phase,
            status: StageStatus::Skipped,
            attempts: outcomes.len(),
            outcomes,
        });
        skips.push(SkipAdvisory::new(&spec.name, reason));
    }

    fn spawn_stage(
        &self,
        stages: &[(StageSpec, Arc<dyn Generator>)],
        name: &str,
        requirement: &str,
        context: &Context,
        cancel: &Arc<CancellationToken>,
    ) -> JoinHandle<StageSettlement> {
        let spec = stage_spec(stages, name).clone();
        let generator = stage_generator(stages, name).clone();
        let controller = self.controller.clone();
        let engine = self.engine;
        let requirement = requirement.to_string();
        let context = context.clone();
        let cancel = cancel.clone();

        tokio::spawn(async move {
            let name = spec.name.clone();
            let settlement = controller
                .execute(
                    &spec,
                    generator.as_ref(),
                    &engine,
                    &requirement,
                    &context,
                    None,
                    &cancel,
                )
                .await;
            (name, settlement)
        })
    }
}

fn stage_spec<'a>(stages: &'a [(StageSpec, Arc<dyn Generator>)], name: &str) -> &'a StageSpec {
    // The executor only dispatches names taken from `stages` itself.
    stages
        .iter()
        .map(|(spec, _)| spec)
        .find(|spec| spec.name == name)
        .unwrap_or_else(|| unreachable!("unknown stage '{}'", name))
}

fn stage_generator<'a>(
    stages: &'a [(StageSpec, Arc<dyn Generator>)],
    name: &str,
) -> &'a Arc<dyn Generator> {
    stages
        .iter()
        .find(|(spec, _)| spec.name == name)
        .map(|(_, generator)| generator)
        .unwrap_or_else(|| unreachable!("unknown stage '{}'", name))
}
