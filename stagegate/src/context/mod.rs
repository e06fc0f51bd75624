//! Shared run context.
//!
//! The [`Context`] is the single place accepted stage results live during a
//! run. It is append-only: a stage name maps to exactly one accepted result,
//! writes happen only at the moment a stage transitions to validated, and an
//! attempt to overwrite an entry is an error. Reads may happen concurrently
//! from any number of in-flight stages.

mod identity;

pub use identity::RunIdentity;

use crate::core::StageResult;
use crate::errors::ContextConflictError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Append-only mapping from stage name to its accepted result.
///
/// Insertion order is preserved. Cloning is cheap; clones share the same
/// underlying storage.
#[derive(Debug, Clone, Default)]
pub struct Context {
    entries: Arc<RwLock<Vec<(String, StageResult)>>>,
}

impl Context {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a validated result for a stage.
    ///
    /// # Errors
    ///
    /// Returns [`ContextConflictError`] if the stage already has an entry.
    pub fn accept(
        &self,
        stage: impl Into<String>,
        result: StageResult,
    ) -> Result<(), ContextConflictError> {
        let stage = stage.into();
        let mut entries = self.entries.write();

        if entries.iter().any(|(name, _)| name == &stage) {
            return Err(ContextConflictError::new(stage));
        }

        entries.push((stage, result));
        Ok(())
    }

    /// Gets a stage's accepted result.
    #[must_use]
    pub fn get(&self, stage: &str) -> Option<StageResult> {
        self.entries
            .read()
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, result)| result.clone())
    }

    /// Checks whether a stage has an accepted result.
    #[must_use]
    pub fn contains(&self, stage: &str) -> bool {
        self.entries.read().iter().any(|(name, _)| name == stage)
    }

    /// Returns accepted stage names in insertion order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Returns the number of accepted entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no result has been accepted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Takes an immutable point-in-time copy for a generation request.
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            entries: self.entries.read().clone(),
        }
    }
}

/// An immutable point-in-time copy of the context.
///
/// Handed to generation collaborators so they never hold a reference into
/// live shared state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    entries: Vec<(String, StageResult)>,
}

impl ContextSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a stage's result from the snapshot.
    #[must_use]
    pub fn get(&self, stage: &str) -> Option<&StageResult> {
        self.entries
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, result)| result)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StageResult)> {
        self.entries
            .iter()
            .map(|(name, result)| (name.as_str(), result))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Finding, FlowStep, Severity};

    fn steps() -> StageResult {
        StageResult::Steps(vec![FlowStep::new("user", "log in", "session created")])
    }

    fn findings() -> StageResult {
        StageResult::Findings(vec![Finding::new(
            "expired card",
            "payment with card past expiry",
            Severity::Medium,
            "prompt for a new card",
        )])
    }

    #[test]
    fn test_accept_and_get() {
        let ctx = Context::new();
        ctx.accept("happy_path", steps()).unwrap();

        assert!(ctx.contains("happy_path"));
        assert_eq!(ctx.len(), 1);
        assert!(ctx.get("happy_path").is_some());
        assert!(ctx.get("missing").is_none());
    }

    #[test]
    fn test_accept_rejects_overwrite() {
        let ctx = Context::new();
        ctx.accept("happy_path", steps()).unwrap();

        let err = ctx.accept("happy_path", findings()).unwrap_err();
        assert_eq!(err.stage, "happy_path");
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let ctx = Context::new();
        ctx.accept("happy_path", steps()).unwrap();
        ctx.accept("business", findings()).unwrap();
        ctx.accept("technical", findings()).unwrap();

        assert_eq!(
            ctx.stage_names(),
            vec![
                "happy_path".to_string(),
                "business".to_string(),
                "technical".to_string()
            ]
        );
    }

    #[test]
    fn test_clones_share_storage() {
        let ctx = Context::new();
        let alias = ctx.clone();
        ctx.accept("happy_path", steps()).unwrap();

        assert!(alias.contains("happy_path"));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let ctx = Context::new();
        ctx.accept("happy_path", steps()).unwrap();

        let snapshot = ctx.snapshot();
        ctx.accept("business", findings()).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("business").is_none());
        assert_eq!(ctx.len(), 2);
    }
}
