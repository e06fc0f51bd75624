//! Coordination policy for the delegating executor.
//!
//! The original system hid "decide what to run next" inside a manager agent;
//! here it is an explicit, testable policy over the dependency graph. The
//! coordinator picks which ready stages to dispatch at each scheduling
//! point, and arbitrates stages that exhausted their validation retries.
//! Passing results are always accepted and continue the run; the review hook
//! only decides the fate of failures.

use crate::context::Context;
use crate::contract::StageSpec;
use crate::core::{Feedback, ValidationOutcome};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt::Debug;

/// Which retry-controller pass a review follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewPass {
    /// The stage's first retry-controller pass was exhausted.
    First,
    /// The coordinator-requested extra pass was exhausted too.
    Reprompted,
}

/// The coordinator's decision for a stage that exhausted its retries.
#[derive(Debug, Clone)]
pub enum ReviewDecision {
    /// Run one extra retry-controller pass seeded with this feedback.
    ///
    /// Only honored once per stage and only after the first pass.
    Reprompt(Feedback),
    /// Permanently skip the stage; recorded as an advisory, never silent.
    Skip {
        /// Why the stage is considered non-essential.
        reason: String,
    },
    /// Give up: the run fails with the stage's exhaustion error.
    Fail,
}

/// Policy evaluated at every scheduling point of the delegating executor.
pub trait Coordinator: Send + Sync + Debug {
    /// Chooses which of the ready stages to dispatch now.
    ///
    /// Names not present in `ready` are ignored; an empty selection
    /// dispatches every ready stage.
    fn select(&self, ready: &[&StageSpec], context: &Context) -> Vec<String> {
        let _ = (ready, context);
        Vec::new()
    }

    /// Arbitrates a stage whose retry-controller pass was exhausted.
    fn review(
        &self,
        spec: &StageSpec,
        attempts: &[ValidationOutcome],
        pass: ReviewPass,
    ) -> ReviewDecision;
}

/// Dispatches everything ready and fails on any exhaustion.
///
/// Makes the delegating executor behave like a parallel, fail-fast version
/// of the sequential one.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyCoordinator;

impl Coordinator for GreedyCoordinator {
    fn review(
        &self,
        _spec: &StageSpec,
        _attempts: &[ValidationOutcome],
        _pass: ReviewPass,
    ) -> ReviewDecision {
        ReviewDecision::Fail
    }
}

/// A coordinator that reprompts once with synthesized feedback and may skip
/// stages it was told are non-essential.
#[derive(Debug, Clone)]
pub struct ReviewCoordinator {
    non_essential: HashSet<String>,
    reprompt: bool,
}

impl Default for ReviewCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewCoordinator {
    /// Creates a coordinator that reprompts once before giving up.
    #[must_use]
    pub fn new() -> Self {
        Self {
            non_essential: HashSet::new(),
            reprompt: true,
        }
    }

    /// Marks a stage as non-essential: exhaustion skips it instead of
    /// failing the run.
    #[must_use]
    pub fn with_non_essential(mut self, stage: impl Into<String>) -> Self {
        self.non_essential.insert(stage.into());
        self
    }

    /// Disables the extra reprompt pass.
    #[must_use]
    pub fn without_reprompt(mut self) -> Self {
        self.reprompt = false;
        self
    }

    /// Builds feedback that goes beyond the validator's own reasons:
    /// deduplicated violations across all attempts, plus a stagnation note
    /// when the last attempts were rejected for identical reasons.
    fn synthesize_feedback(attempts: &[ValidationOutcome]) -> Feedback {
        let mut reasons = Vec::new();
        for outcome in attempts {
            for reason in &outcome.reasons {
                if !reasons.contains(reason) {
                    reasons.push(reason.clone());
                }
            }
        }

        let mut feedback = Feedback {
            attempt: attempts.len(),
            reasons,
        };

        if is_stagnant(attempts) {
            feedback = feedback.with_extra(
                "every attempt was rejected for the same reasons; produce a substantially \
                 different result instead of rephrasing the previous one",
            );
        }

        feedback
    }
}

impl Coordinator for ReviewCoordinator {
    fn review(
        &self,
        spec: &StageSpec,
        attempts: &[ValidationOutcome],
        pass: ReviewPass,
    ) -> ReviewDecision {
        if pass == ReviewPass::First && self.reprompt {
            return ReviewDecision::Reprompt(Self::synthesize_feedback(attempts));
        }
        if self.non_essential.contains(&spec.name) {
            return ReviewDecision::Skip {
                reason: format!(
                    "non-essential stage '{}' exhausted validation retries",
                    spec.name
                ),
            };
        }
        ReviewDecision::Fail
    }
}

/// True when the last two attempts were rejected for identical reasons,
/// compared by fingerprint.
fn is_stagnant(attempts: &[ValidationOutcome]) -> bool {
    if attempts.len() < 2 {
        return false;
    }
    let last = fingerprint(&attempts[attempts.len() - 1]);
    let previous = fingerprint(&attempts[attempts.len() - 2]);
    last == previous
}

fn fingerprint(outcome: &ValidationOutcome) -> String {
    let mut hasher = Sha256::new();
    for reason in &outcome.reasons {
        hasher.update(reason.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}
