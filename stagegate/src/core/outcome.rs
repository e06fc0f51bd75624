//! Validation outcomes and retry feedback.

use serde::{Deserialize, Serialize};

/// The verdict of one validation pass over a stage result.
///
/// Produced fresh per attempt and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Whether the result was accepted.
    pub passed: bool,
    /// Human-readable violation strings, in rule-evaluation order.
    pub reasons: Vec<String>,
}

impl ValidationOutcome {
    /// Creates a passing outcome with no reasons.
    #[must_use]
    pub fn accepted() -> Self {
        Self {
            passed: true,
            reasons: Vec::new(),
        }
    }

    /// Creates a failing outcome with the given reasons.
    #[must_use]
    pub fn rejected(reasons: Vec<String>) -> Self {
        Self {
            passed: false,
            reasons,
        }
    }

    /// Builds an outcome from collected reasons; empty reasons means a pass.
    #[must_use]
    pub fn from_reasons(reasons: Vec<String>) -> Self {
        Self {
            passed: reasons.is_empty(),
            reasons,
        }
    }
}

/// Structured feedback handed to the next generation attempt.
///
/// The retry controller threads this into the generation request explicitly;
/// there is no side channel between validator and collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// The attempt the feedback was derived from (1-indexed).
    pub attempt: usize,
    /// Rejection reasons to address in the next attempt.
    pub reasons: Vec<String>,
}

impl Feedback {
    /// Derives feedback from a rejected validation outcome.
    #[must_use]
    pub fn from_outcome(attempt: usize, outcome: &ValidationOutcome) -> Self {
        Self {
            attempt,
            reasons: outcome.reasons.clone(),
        }
    }

    /// Appends additional synthesized guidance beyond the validator's reasons.
    #[must_use]
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.reasons.push(extra.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_outcome_has_no_reasons() {
        let outcome = ValidationOutcome::accepted();
        assert!(outcome.passed);
        assert!(outcome.reasons.is_empty());
    }

    #[test]
    fn test_from_reasons() {
        assert!(ValidationOutcome::from_reasons(Vec::new()).passed);
        assert!(!ValidationOutcome::from_reasons(vec!["bad".to_string()]).passed);
    }

    #[test]
    fn test_feedback_from_outcome() {
        let outcome = ValidationOutcome::rejected(vec!["needs at least 5 findings".to_string()]);
        let feedback = Feedback::from_outcome(1, &outcome).with_extra("previous attempts were identical");

        assert_eq!(feedback.attempt, 1);
        assert_eq!(feedback.reasons.len(), 2);
        assert_eq!(feedback.reasons[0], "needs at least 5 findings");
    }
}
