//! Quality policy and the final publish/reject gate.
//!
//! The gate is the last pure step of a run: it folds per-stage validation
//! history, the overlap detector's findings, and numeric scores into a
//! single [`QualityGateReport`] with one `publishable` flag. Evaluating the
//! same completed run twice yields an identical report (modulo the report
//! timestamp).

mod policy;

pub use policy::QualityPolicy;

use crate::core::{Severity, StagePhase, StageStatus};
use crate::overlap::{detect_overlap, OverlapCheck};
use crate::pipeline::{RunRecord, SkipAdvisory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The gate's view of one stage's validation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageVerdict {
    /// The stage name.
    pub stage: String,
    /// The stage's phase.
    pub phase: StagePhase,
    /// Whether the stage's final validation outcome passed.
    pub passed: bool,
    /// Validation attempts consumed.
    pub attempts: usize,
    /// Every rejection reason from every attempt, in order.
    pub reasons: Vec<String>,
}

/// One named numeric score compared against its threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// The score name (e.g. "coverage", "resilience").
    pub name: String,
    /// The stage the score was computed for.
    pub stage: String,
    /// The score value, 0 to 100.
    pub value: u32,
    /// The minimum acceptable value.
    pub threshold: u32,
    /// Whether the value meets the threshold.
    pub passed: bool,
}

/// The terminal artifact of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityGateReport {
    /// Identity of the run this report describes.
    pub run_id: Uuid,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    /// The requirement text that drove the run.
    pub requirement: String,
    /// Per-stage validation verdicts.
    pub verdicts: Vec<StageVerdict>,
    /// Numeric scores against thresholds.
    pub scores: Vec<ScoreEntry>,
    /// Violations from the overlap detector.
    pub overlap_violations: Vec<String>,
    /// Accepted findings whose descriptions hit the generic-phrase blocklist.
    pub vague_findings: Vec<String>,
    /// Coordinator skip decisions, surfaced as advisories.
    pub skipped: Vec<SkipAdvisory>,
    /// The single publish/reject verdict.
    pub publishable: bool,
}

/// Aggregates a completed run into a publish/reject decision.
#[derive(Debug, Clone)]
pub struct QualityGate {
    policy: QualityPolicy,
    overlap_check: Option<OverlapCheck>,
}

impl QualityGate {
    /// Creates a gate with the given policy and no overlap check.
    #[must_use]
    pub fn new(policy: QualityPolicy) -> Self {
        Self {
            policy,
            overlap_check: None,
        }
    }

    /// Enables overlap detection between two named stages.
    #[must_use]
    pub fn with_overlap_check(mut self, check: OverlapCheck) -> Self {
        self.overlap_check = Some(check);
        self
    }

    /// Evaluates a completed run.
    ///
    /// Deterministic over its inputs: verdicts, scores, violations, and the
    /// `publishable` flag are identical across repeated evaluations of the
    /// same record.
    #[must_use]
    pub fn evaluate(&self, record: &RunRecord) -> QualityGateReport {
        let verdicts = self.verdicts(record);
        let scores = self.scores(record);
        let overlap_violations = self.overlap_violations(record);
        let vague_findings = self.vague_findings(record);

        let publishable = verdicts.iter().all(|v| v.passed)
            && scores.iter().all(|s| s.passed)
            && overlap_violations.is_empty()
            && vague_findings.is_empty();

        QualityGateReport {
            run_id: record.identity.run_id,
            generated_at: Utc::now(),
            requirement: record.requirement.clone(),
            verdicts,
            scores,
            overlap_violations,
            vague_findings,
            skipped: record.skips.clone(),
            publishable,
        }
    }

    fn verdicts(&self, record: &RunRecord) -> Vec<StageVerdict> {
        record
            .executions
            .iter()
            .filter(|execution| execution.status != StageStatus::Skipped)
            .map(|execution| StageVerdict {
                stage: execution.stage.clone(),
                phase: execution.phase,
                passed: execution.status == StageStatus::Validated
                    && execution.final_outcome_passed(),
                attempts: execution.attempts,
                reasons: execution.all_reasons(),
            })
            .collect()
    }

    /// Scores follow a saturating-ratio scheme: more accepted findings and
    /// more severe findings score higher, capping at 100.
    fn scores(&self, record: &RunRecord) -> Vec<ScoreEntry> {
        let mut entries = Vec::new();
        let min_items = self.policy.min_items_per_stage.max(1) as u32;
        let threshold = self.policy.min_numeric_score;

        for execution in &record.executions {
            if execution.phase != StagePhase::Exception
                || execution.status != StageStatus::Validated
            {
                continue;
            }
            let Some(result) = record.context.get(&execution.stage) else {
                continue;
            };
            let Some(findings) = result.as_findings() else {
                continue;
            };

            let count = findings.len() as u32;
            let coverage = (count * 100 / min_items).min(100);

            let weight_sum: u32 = findings.iter().map(|f| f.severity.weight()).sum();
            let resilience =
                (weight_sum * 100 / (min_items * Severity::High.weight())).min(100);

            entries.push(ScoreEntry {
                name: "coverage".to_string(),
                stage: execution.stage.clone(),
                value: coverage,
                threshold,
                passed: coverage >= threshold,
            });
            entries.push(ScoreEntry {
                name: "resilience".to_string(),
                stage: execution.stage.clone(),
                value: resilience,
                threshold,
                passed: resilience >= threshold,
            });
        }

        entries
    }

    fn overlap_violations(&self, record: &RunRecord) -> Vec<String> {
        let Some(check) = &self.overlap_check else {
            return Vec::new();
        };
        let (Some(left), Some(right)) = (
            record.context.get(&check.left_stage),
            record.context.get(&check.right_stage),
        ) else {
            return Vec::new();
        };
        let (Some(left), Some(right)) = (left.as_findings(), right.as_findings()) else {
            return Vec::new();
        };

        detect_overlap(left, right, check)
    }

    /// Zero tolerance for blocklisted vague phrasing in accepted findings,
    /// independent of whatever per-stage rules already ran.
    fn vague_findings(&self, record: &RunRecord) -> Vec<String> {
        let mut hits = Vec::new();

        for stage in record.context.stage_names() {
            let Some(result) = record.context.get(&stage) else {
                continue;
            };
            let Some(findings) = result.as_findings() else {
                continue;
            };
            for finding in findings {
                let normalized = finding.description.trim().to_lowercase();
                if self
                    .policy
                    .blocked_generic_phrases
                    .iter()
                    .any(|phrase| normalized == phrase.trim().to_lowercase())
                {
                    hits.push(format!(
                        "stage '{}' finding '{}' is blocklisted vague phrasing",
                        stage, finding.description
                    ));
                }
            }
        }

        hits
    }
}
