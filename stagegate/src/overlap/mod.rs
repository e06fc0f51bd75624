//! Overlap detection between two exception result sets.
//!
//! Catches two failure modes of independently produced finding sets: the
//! same scenario reported twice (exact duplicate descriptions), and
//! miscategorized entries where a finding in one set reads like it belongs
//! to the other (cross-contamination against the other set's declared
//! keyword vocabulary). Pure and deterministic; never touches the context.

use crate::core::Finding;
use serde::{Deserialize, Serialize};

/// Configuration naming the two result sets and their vocabularies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapCheck {
    /// Stage name of the first set (e.g. business findings).
    pub left_stage: String,
    /// Keyword vocabulary that characterizes the first set.
    pub left_vocabulary: Vec<String>,
    /// Stage name of the second set (e.g. technical findings).
    pub right_stage: String,
    /// Keyword vocabulary that characterizes the second set.
    pub right_vocabulary: Vec<String>,
}

impl OverlapCheck {
    /// Creates a new overlap check between two named stages.
    #[must_use]
    pub fn new(left_stage: impl Into<String>, right_stage: impl Into<String>) -> Self {
        Self {
            left_stage: left_stage.into(),
            left_vocabulary: Vec::new(),
            right_stage: right_stage.into(),
            right_vocabulary: Vec::new(),
        }
    }

    /// Sets the first set's vocabulary.
    #[must_use]
    pub fn with_left_vocabulary(mut self, vocabulary: Vec<String>) -> Self {
        self.left_vocabulary = vocabulary;
        self
    }

    /// Sets the second set's vocabulary.
    #[must_use]
    pub fn with_right_vocabulary(mut self, vocabulary: Vec<String>) -> Self {
        self.right_vocabulary = vocabulary;
        self
    }
}

/// Detects duplicates and cross-contamination between two finding sets.
///
/// Returns violation strings in a fixed order: duplicates first (in order of
/// the first set), then contamination of the first set by the second set's
/// vocabulary, then the reverse.
#[must_use]
pub fn detect_overlap(left: &[Finding], right: &[Finding], check: &OverlapCheck) -> Vec<String> {
    let mut violations = Vec::new();

    let right_descriptions: Vec<String> = right
        .iter()
        .map(|f| f.description.trim().to_lowercase())
        .collect();

    for finding in left {
        let normalized = finding.description.trim().to_lowercase();
        if right_descriptions.contains(&normalized) {
            violations.push(format!(
                "duplicate: '{}' appears in both '{}' and '{}'",
                finding.description, check.left_stage, check.right_stage
            ));
        }
    }

    contamination(
        left,
        &check.right_vocabulary,
        &check.left_stage,
        &check.right_stage,
        &mut violations,
    );
    contamination(
        right,
        &check.left_vocabulary,
        &check.right_stage,
        &check.left_stage,
        &mut violations,
    );

    violations
}

fn contamination(
    findings: &[Finding],
    other_vocabulary: &[String],
    own_stage: &str,
    other_stage: &str,
    violations: &mut Vec<String>,
) {
    for finding in findings {
        let text = finding.description.to_lowercase();
        for keyword in other_vocabulary {
            if text.contains(&keyword.to_lowercase()) {
                violations.push(format!(
                    "cross-contamination: '{}' in '{}' contains '{}' keyword '{}'",
                    finding.description, own_stage, other_stage, keyword
                ));
            }
        }
    }
}
