//! Typed stage results.
//!
//! A stage produces either an ordered walk-through of the success flow
//! ([`FlowStep`]s) or a set of exception findings ([`Finding`]s). Results are
//! owned by the executor until validated and become immutable once accepted
//! into the shared context.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Impact level of an exception finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Cosmetic or negligible impact.
    Low,
    /// Degraded behavior with a workaround.
    Medium,
    /// Major functional impact.
    High,
    /// Data loss, outage, or irrecoverable state.
    Critical,
}

impl Severity {
    /// Weight used by severity-aware scoring.
    #[must_use]
    pub fn weight(&self) -> u32 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// One step of a happy-path flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    /// Who performs the action (user, system, external service).
    pub actor: String,
    /// The action being performed.
    pub action: String,
    /// The expected result of the action.
    pub outcome: String,
}

impl FlowStep {
    /// Creates a new flow step.
    #[must_use]
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        outcome: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            outcome: outcome.into(),
        }
    }
}

/// One exception / edge-case finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Description of the failure scenario.
    pub description: String,
    /// What triggers the scenario.
    pub trigger: String,
    /// Impact of the failure.
    pub severity: Severity,
    /// How to handle or prevent the failure.
    pub mitigation: String,
}

impl Finding {
    /// Creates a new finding.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        trigger: impl Into<String>,
        severity: Severity,
        mitigation: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            trigger: trigger.into(),
            severity,
            mitigation: mitigation.into(),
        }
    }

    /// The searchable text of this finding, used by content rules.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.description, self.trigger)
    }
}

/// The kind of result a stage is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// An ordered sequence of flow steps.
    Steps,
    /// A set of exception findings.
    Findings,
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Steps => write!(f, "steps"),
            Self::Findings => write!(f, "findings"),
        }
    }
}

/// The structured output of one stage execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum StageResult {
    /// A happy-path flow.
    Steps(Vec<FlowStep>),
    /// An exception-analysis result set.
    Findings(Vec<Finding>),
}

impl StageResult {
    /// Returns the kind of this result.
    #[must_use]
    pub fn kind(&self) -> ResultKind {
        match self {
            Self::Steps(_) => ResultKind::Steps,
            Self::Findings(_) => ResultKind::Findings,
        }
    }

    /// Returns the number of items in the result.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Steps(steps) => steps.len(),
            Self::Findings(findings) => findings.len(),
        }
    }

    /// Returns true if the result holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the findings, if this is a findings result.
    #[must_use]
    pub fn as_findings(&self) -> Option<&[Finding]> {
        match self {
            Self::Findings(findings) => Some(findings),
            Self::Steps(_) => None,
        }
    }

    /// Returns the steps, if this is a steps result.
    #[must_use]
    pub fn as_steps(&self) -> Option<&[FlowStep]> {
        match self {
            Self::Steps(steps) => Some(steps),
            Self::Findings(_) => None,
        }
    }

    /// Per-item description text, used by duplicate and blocklist rules.
    #[must_use]
    pub fn descriptions(&self) -> Vec<&str> {
        match self {
            Self::Steps(steps) => steps.iter().map(|s| s.action.as_str()).collect(),
            Self::Findings(findings) => {
                findings.iter().map(|f| f.description.as_str()).collect()
            }
        }
    }
}
