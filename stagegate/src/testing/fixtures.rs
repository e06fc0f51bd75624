//! Canned stage results for tests and examples.

use crate::core::{Finding, FlowStep, Severity, StageResult};

/// A steps result with `count` distinct, plausible flow steps.
#[must_use]
pub fn steps_result(count: usize) -> StageResult {
    let steps = (0..count)
        .map(|index| {
            FlowStep::new(
                if index % 2 == 0 { "user" } else { "system" },
                format!("perform step {}", index + 1),
                format!("step {} completed", index + 1),
            )
        })
        .collect();
    StageResult::Steps(steps)
}

/// A findings result with `count` distinct findings of mixed severity.
#[must_use]
pub fn findings_result(count: usize) -> StageResult {
    labeled_findings_result("scenario", count)
}

/// A findings result whose descriptions share a label prefix, so two sets
/// can be made disjoint or overlapping on purpose.
#[must_use]
pub fn labeled_findings_result(label: &str, count: usize) -> StageResult {
    let severities = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];
    let findings = (0..count)
        .map(|index| {
            Finding::new(
                format!("{} {} fails unexpectedly", label, index + 1),
                format!("{} {} triggered by unusual input", label, index + 1),
                severities[index % severities.len()],
                format!("add a guard for {} {}", label, index + 1),
            )
        })
        .collect();
    StageResult::Findings(findings)
}
