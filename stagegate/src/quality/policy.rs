//! Named thresholds and keyword blocklists supplied at pipeline construction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The product quality policy: thresholds, blocklists, and vocabularies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityPolicy {
    /// Minimum accepted findings per exception stage.
    pub min_items_per_stage: usize,
    /// Minimum acceptable value for every numeric score, 0 to 100.
    pub min_numeric_score: u32,
    /// Maximum attempts per stage (validation and generation each).
    pub max_retries: usize,
    /// Per-attempt timeout for generation calls.
    pub per_stage_timeout: Option<Duration>,
    /// Finding descriptions that are too vague to be actionable.
    pub blocked_generic_phrases: Vec<String>,
    /// Keywords that mark a finding as technical/infrastructure territory.
    pub technical_keyword_vocabulary: Vec<String>,
    /// Keywords that mark a finding as business-rule territory.
    pub business_keyword_vocabulary: Vec<String>,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            min_items_per_stage: 5,
            min_numeric_score: 70,
            max_retries: 3,
            per_stage_timeout: None,
            blocked_generic_phrases: [
                "something goes wrong",
                "an error occurs",
                "the system fails",
                "handle the error",
                "edge case occurs",
                "unexpected behavior",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            technical_keyword_vocabulary: [
                "database",
                "network",
                "concurrency",
                "timeout",
                "connection",
                "api",
                "race condition",
                "transaction",
                "circuit breaker",
                "latency",
                "throughput",
                "scalability",
                "replication",
                "caching",
                "load balancer",
                "queue",
                "websocket",
                "deployment",
                "encryption",
                "authentication",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            business_keyword_vocabulary: [
                "refund",
                "invoice",
                "pricing",
                "discount",
                "subscription",
                "account balance",
                "loyalty",
                "order limit",
                "approval",
                "compliance",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

impl QualityPolicy {
    /// Creates a policy with product defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum items per exception stage.
    #[must_use]
    pub fn with_min_items_per_stage(mut self, min_items: usize) -> Self {
        self.min_items_per_stage = min_items;
        self
    }

    /// Sets the minimum numeric score.
    #[must_use]
    pub fn with_min_numeric_score(mut self, score: u32) -> Self {
        self.min_numeric_score = score;
        self
    }

    /// Sets the retry bound.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the per-stage generation timeout.
    #[must_use]
    pub fn with_per_stage_timeout(mut self, timeout: Duration) -> Self {
        self.per_stage_timeout = Some(timeout);
        self
    }

    /// Replaces the generic-phrase blocklist.
    #[must_use]
    pub fn with_blocked_generic_phrases(mut self, phrases: Vec<String>) -> Self {
        self.blocked_generic_phrases = phrases;
        self
    }

    /// Replaces the technical keyword vocabulary.
    #[must_use]
    pub fn with_technical_vocabulary(mut self, vocabulary: Vec<String>) -> Self {
        self.technical_keyword_vocabulary = vocabulary;
        self
    }

    /// Replaces the business keyword vocabulary.
    #[must_use]
    pub fn with_business_vocabulary(mut self, vocabulary: Vec<String>) -> Self {
        self.business_keyword_vocabulary = vocabulary;
        self
    }
}
