//! The validation engine.
//!
//! Decides whether a candidate [`StageResult`] is acceptable against its
//! [`StageSpec`]. Validation is deterministic and side-effect-free:
//! re-running it on the same inputs always yields the same outcome, which is
//! what makes retry-with-feedback and report idempotence testable.
//!
//! Two tiers run in order. Structural checks come first (result kind,
//! non-emptiness, minimum cardinality); an empty collection always fails
//! regardless of content rules. Content rules then run over the result's
//! text fields, optionally consulting the accumulated context for
//! cross-stage rules.

use crate::context::Context;
use crate::contract::{ContentRule, StageSpec};
use crate::core::{StageResult, ValidationOutcome};

/// Stateless validator shared by both executors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationEngine;

impl ValidationEngine {
    /// Creates a new validation engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validates a candidate result against its stage contract.
    #[must_use]
    pub fn validate(
        &self,
        spec: &StageSpec,
        result: &StageResult,
        context: Option<&Context>,
    ) -> ValidationOutcome {
        let mut reasons = Vec::new();

        self.check_structure(spec, result, &mut reasons);

        // Content rules only make sense over a structurally sound result,
        // but they still run so a single outcome carries every violation.
        for rule in &spec.rules {
            self.check_rule(spec, rule, result, context, &mut reasons);
        }

        ValidationOutcome::from_reasons(reasons)
    }

    fn check_structure(&self, spec: &StageSpec, result: &StageResult, reasons: &mut Vec<String>) {
        if result.kind() != spec.shape.kind {
            reasons.push(format!(
                "stage '{}' expects {} but got {}",
                spec.name,
                spec.shape.kind,
                result.kind()
            ));
            return;
        }

        if result.is_empty() {
            reasons.push(format!(
                "stage '{}' produced an empty result; at least {} items required",
                spec.name, spec.shape.min_items
            ));
            return;
        }

        if result.len() < spec.shape.min_items {
            reasons.push(format!(
                "stage '{}' produced {} items; at least {} required",
                spec.name,
                result.len(),
                spec.shape.min_items
            ));
        }
    }

    fn check_rule(
        &self,
        spec: &StageSpec,
        rule: &ContentRule,
        result: &StageResult,
        context: Option<&Context>,
        reasons: &mut Vec<String>,
    ) {
        match rule {
            ContentRule::ForbidKeywords { vocabulary } => {
                self.check_keywords(spec, vocabulary, result, reasons);
            }
            ContentRule::ForbidGenericPhrases { phrases } => {
                self.check_generic_phrases(spec, phrases, result, reasons);
            }
            ContentRule::DistinctFrom { stage } => {
                self.check_distinct_from(spec, stage, result, context, reasons);
            }
        }
    }

    fn check_keywords(
        &self,
        spec: &StageSpec,
        vocabulary: &[String],
        result: &StageResult,
        reasons: &mut Vec<String>,
    ) {
        let texts: Vec<String> = match result {
            StageResult::Findings(findings) => findings
                .iter()
                .map(|f| f.searchable_text().to_lowercase())
                .collect(),
            StageResult::Steps(steps) => steps
                .iter()
                .map(|s| format!("{} {}", s.action, s.outcome).to_lowercase())
                .collect(),
        };

        for keyword in vocabulary {
            let needle = keyword.to_lowercase();
            for (index, text) in texts.iter().enumerate() {
                if text.contains(&needle) {
                    reasons.push(format!(
                        "stage '{}' item {} contains forbidden keyword '{}'",
                        spec.name,
                        index + 1,
                        keyword
                    ));
                    break;
                }
            }
        }
    }

    fn check_generic_phrases(
        &self,
        spec: &StageSpec,
        phrases: &[String],
        result: &StageResult,
        reasons: &mut Vec<String>,
    ) {
        for (index, description) in result.descriptions().iter().enumerate() {
            let normalized = description.trim().to_lowercase();
            for phrase in phrases {
                if normalized == phrase.trim().to_lowercase() {
                    reasons.push(format!(
                        "stage '{}' item {} description '{}' is a blocklisted generic phrase",
                        spec.name,
                        index + 1,
                        description
                    ));
                }
            }
        }
    }

    fn check_distinct_from(
        &self,
        spec: &StageSpec,
        other_stage: &str,
        result: &StageResult,
        context: Option<&Context>,
        reasons: &mut Vec<String>,
    ) {
        let Some(prior) = context.and_then(|ctx| ctx.get(other_stage)) else {
            return;
        };

        let prior_descriptions: Vec<String> = prior
            .descriptions()
            .iter()
            .map(|d| d.trim().to_lowercase())
            .collect();

        for (index, description) in result.descriptions().iter().enumerate() {
            let normalized = description.trim().to_lowercase();
            if prior_descriptions.contains(&normalized) {
                reasons.push(format!(
                    "stage '{}' item {} duplicates description '{}' already accepted under stage '{}'",
                    spec.name,
                    index + 1,
                    description,
                    other_stage
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ResultShape;
    use crate::core::{Finding, FlowStep, Severity, StagePhase};
    use pretty_assertions::assert_eq;

    fn findings_spec(min_items: usize) -> StageSpec {
        StageSpec::new("business", StagePhase::Exception, ResultShape::findings(min_items))
    }

    fn finding(description: &str) -> Finding {
        Finding::new(description, "trigger", Severity::Medium, "mitigate")
    }

    fn findings(descriptions: &[&str]) -> StageResult {
        StageResult::Findings(descriptions.iter().map(|d| finding(d)).collect())
    }

    #[test]
    fn test_valid_result_passes_with_empty_reasons() {
        let engine = ValidationEngine::new();
        let spec = findings_spec(2);
        let result = findings(&["expired card", "duplicate order"]);

        let outcome = engine.validate(&spec, &result, None);
        assert!(outcome.passed);
        assert_eq!(outcome.reasons, Vec::<String>::new());
    }

    #[test]
    fn test_below_minimum_fails_naming_the_minimum() {
        let engine = ValidationEngine::new();
        let spec = findings_spec(5);
        let result = findings(&["expired card", "duplicate order"]);

        let outcome = engine.validate(&spec, &result, None);
        assert!(!outcome.passed);
        assert!(outcome.reasons[0].contains("at least 5"));
    }

    #[test]
    fn test_empty_result_always_fails() {
        let engine = ValidationEngine::new();
        let spec = findings_spec(1);
        let result = StageResult::Findings(Vec::new());

        let outcome = engine.validate(&spec, &result, None);
        assert!(!outcome.passed);
        assert!(outcome.reasons[0].contains("empty"));
    }

    #[test]
    fn test_kind_mismatch_fails() {
        let engine = ValidationEngine::new();
        let spec = findings_spec(1);
        let result = StageResult::Steps(vec![FlowStep::new("user", "log in", "ok")]);

        let outcome = engine.validate(&spec, &result, None);
        assert!(!outcome.passed);
        assert!(outcome.reasons[0].contains("expects findings"));
    }

    #[test]
    fn test_keyword_match_is_case_insensitive_substring() {
        let engine = ValidationEngine::new();
        let spec = findings_spec(1).with_rule(ContentRule::ForbidKeywords {
            vocabulary: vec!["database".to_string()],
        });
        let result = findings(&["Database connection drops mid-checkout"]);

        let outcome = engine.validate(&spec, &result, None);
        assert!(!outcome.passed);
        assert!(outcome.reasons[0].contains("forbidden keyword 'database'"));
    }

    #[test]
    fn test_keyword_checked_in_trigger_text() {
        let engine = ValidationEngine::new();
        let spec = findings_spec(1).with_rule(ContentRule::ForbidKeywords {
            vocabulary: vec!["timeout".to_string()],
        });
        let result = StageResult::Findings(vec![Finding::new(
            "order stuck in processing",
            "upstream TIMEOUT after 5s",
            Severity::High,
            "retry with backoff",
        )]);

        let outcome = engine.validate(&spec, &result, None);
        assert!(!outcome.passed);
    }

    #[test]
    fn test_generic_phrase_blocklist_is_exact_match() {
        let engine = ValidationEngine::new();
        let spec = findings_spec(1).with_rule(ContentRule::ForbidGenericPhrases {
            phrases: vec!["something goes wrong".to_string()],
        });

        let vague = findings(&["  Something Goes Wrong  "]);
        let outcome = engine.validate(&spec, &vague, None);
        assert!(!outcome.passed);
        assert!(outcome.reasons[0].contains("blocklisted generic phrase"));

        // Substrings are fine; only whole-description matches are vague.
        let specific = findings(&["something goes wrong during refund reversal"]);
        let outcome = engine.validate(&spec, &specific, None);
        assert!(outcome.passed);
    }

    #[test]
    fn test_distinct_from_prior_stage() {
        let engine = ValidationEngine::new();
        let context = Context::new();
        context
            .accept("business", findings(&["insufficient balance"]))
            .unwrap();

        let spec = StageSpec::new(
            "technical",
            StagePhase::Exception,
            ResultShape::findings(1),
        )
        .with_rule(ContentRule::DistinctFrom {
            stage: "business".to_string(),
        });

        let duplicate = findings(&["Insufficient Balance"]);
        let outcome = engine.validate(&spec, &duplicate, Some(&context));
        assert!(!outcome.passed);
        assert!(outcome.reasons[0].contains("already accepted under stage 'business'"));

        let fresh = findings(&["connection pool exhausted"]);
        let outcome = engine.validate(&spec, &fresh, Some(&context));
        assert!(outcome.passed);
    }

    #[test]
    fn test_validation_is_deterministic() {
        let engine = ValidationEngine::new();
        let spec = findings_spec(5).with_rule(ContentRule::ForbidKeywords {
            vocabulary: vec!["api".to_string()],
        });
        let result = findings(&["api returns stale price"]);

        let first = engine.validate(&spec, &result, None);
        let second = engine.validate(&spec, &result, None);
        assert_eq!(first, second);
    }
}
