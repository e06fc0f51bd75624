//! Stage contracts: what "good" output looks like, independent of execution.
//!
//! A [`StageSpec`] is pure configuration, constructed once at pipeline setup
//! and never mutated. Its shape descriptor drives the validation engine's
//! structural checks and its dependency list drives readiness in both
//! executors.

use crate::core::{ResultKind, StagePhase};
use crate::errors::PipelineBuildError;
use serde::{Deserialize, Serialize};

/// The expected shape of a stage's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultShape {
    /// The result kind the stage must produce.
    pub kind: ResultKind,
    /// Minimum number of items the result must contain.
    pub min_items: usize,
}

impl ResultShape {
    /// A happy-path shape: ordered steps with a minimum count.
    #[must_use]
    pub fn steps(min_items: usize) -> Self {
        Self {
            kind: ResultKind::Steps,
            min_items,
        }
    }

    /// An exception shape: findings with a minimum count.
    #[must_use]
    pub fn findings(min_items: usize) -> Self {
        Self {
            kind: ResultKind::Findings,
            min_items,
        }
    }
}

/// A content-quality rule evaluated over a stage result's text fields.
///
/// Rules are data, not code, so a pipeline's quality policy can be inspected
/// and serialized alongside its report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ContentRule {
    /// No item's text may contain any of these keywords
    /// (case-insensitive substring match).
    ForbidKeywords {
        /// The forbidden vocabulary.
        vocabulary: Vec<String>,
    },
    /// No item's description may equal one of these phrases
    /// (case-insensitive, after trimming).
    ForbidGenericPhrases {
        /// The blocklisted phrases.
        phrases: Vec<String>,
    },
    /// No item's description may duplicate a description already accepted
    /// under the named prior stage.
    DistinctFrom {
        /// The prior stage to compare against.
        stage: String,
    },
}

/// Specification of a single stage: identity, dependencies, and the contract
/// its result must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    /// The unique name of the stage.
    pub name: String,
    /// The analysis phase this stage belongs to.
    pub phase: StagePhase,
    /// Names of stages whose accepted results this stage needs, in order.
    pub dependencies: Vec<String>,
    /// The expected result shape.
    pub shape: ResultShape,
    /// Content rules the result must satisfy.
    pub rules: Vec<ContentRule>,
}

impl StageSpec {
    /// Creates a new stage specification.
    #[must_use]
    pub fn new(name: impl Into<String>, phase: StagePhase, shape: ResultShape) -> Self {
        Self {
            name: name.into(),
            phase,
            dependencies: Vec::new(),
            shape,
            rules: Vec::new(),
        }
    }

    /// Adds a dependency, preserving declaration order.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        let dep = dep.into();
        if !self.dependencies.contains(&dep) {
            self.dependencies.push(dep);
        }
        self
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a content rule.
    #[must_use]
    pub fn with_rule(mut self, rule: ContentRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Validates the specification itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the stage depends on itself.
    pub fn validate(&self) -> Result<(), PipelineBuildError> {
        if self.name.trim().is_empty() {
            return Err(PipelineBuildError::new(
                "stage name cannot be empty or whitespace-only",
            ));
        }
        if self.dependencies.iter().any(|dep| dep == &self.name) {
            return Err(PipelineBuildError::new(format!(
                "stage '{}' cannot depend on itself",
                self.name
            ))
            .with_stages(vec![self.name.clone()]));
        }
        Ok(())
    }
}
