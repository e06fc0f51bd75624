//! Mock generators that record calls and replay scripted outcomes.

use crate::core::StageResult;
use crate::errors::GenerationError;
use crate::generate::{GenerationRequest, Generator};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// A generator that replays a scripted sequence of outcomes and records
/// every request it receives.
#[derive(Debug)]
pub struct ScriptedGenerator {
    name: String,
    script: Mutex<VecDeque<Result<StageResult, GenerationError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    invocation_log: Option<Arc<Mutex<Vec<String>>>>,
}

impl ScriptedGenerator {
    /// Creates a new scripted generator with an empty script.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            invocation_log: None,
        }
    }

    /// Attaches a shared log; each invocation appends the generator's name.
    ///
    /// Lets tests assert cross-stage invocation ordering.
    #[must_use]
    pub fn with_invocation_log(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.invocation_log = Some(log);
        self
    }

    /// Queues a successful candidate.
    pub fn push_ok(&self, result: StageResult) {
        self.script.lock().push_back(Ok(result));
    }

    /// Queues a generation error.
    pub fn push_err(&self, error: GenerationError) {
        self.script.lock().push_back(Err(error));
    }

    /// Returns the number of times the generator was invoked.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns every request received, in invocation order.
    #[must_use]
    pub fn recorded_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<StageResult, GenerationError> {
        self.requests.lock().push(request.clone());
        if let Some(log) = &self.invocation_log {
            log.lock().push(self.name.clone());
        }

        self.script.lock().pop_front().unwrap_or_else(|| {
            Err(GenerationError::Collaborator(format!(
                "scripted generator '{}' ran out of responses",
                self.name
            )))
        })
    }
}

/// A generator that sleeps before delegating, for timeout and cancellation
/// tests.
#[derive(Debug)]
pub struct SlowGenerator {
    delay: Duration,
    inner: Arc<dyn Generator>,
}

impl SlowGenerator {
    /// Creates a generator that waits `delay` before answering.
    #[must_use]
    pub fn new(delay: Duration, inner: Arc<dyn Generator>) -> Self {
        Self { delay, inner }
    }
}

#[async_trait]
impl Generator for SlowGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<StageResult, GenerationError> {
        tokio::time::sleep(self.delay).await;
        self.inner.generate(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextSnapshot;
    use crate::testing::findings_result;

    #[tokio::test]
    async fn test_scripted_generator_replays_in_order() {
        let generator = ScriptedGenerator::new("gen");
        generator.push_ok(findings_result(2));
        generator.push_err(GenerationError::Collaborator("down".to_string()));

        let request = GenerationRequest::new("req", "business", ContextSnapshot::new());

        assert!(generator.generate(&request).await.is_ok());
        assert!(generator.generate(&request).await.is_err());
        // Script exhausted.
        assert!(generator.generate(&request).await.is_err());
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_invocation_log_records_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = ScriptedGenerator::new("first").with_invocation_log(log.clone());
        let second = ScriptedGenerator::new("second").with_invocation_log(log.clone());
        first.push_ok(findings_result(1));
        second.push_ok(findings_result(1));

        let request = GenerationRequest::new("req", "any", ContextSnapshot::new());
        first.generate(&request).await.unwrap();
        second.generate(&request).await.unwrap();

        assert_eq!(*log.lock(), vec!["first".to_string(), "second".to_string()]);
    }
}
