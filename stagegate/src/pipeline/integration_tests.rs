//! End-to-end pipeline tests through the public run API.

use crate::contract::{ContentRule, ResultShape, StageSpec};
use crate::core::{Finding, FlowStep, Severity, StagePhase, StageResult};
use crate::errors::{GenerationError, PipelineError};
use crate::generate::Generator;
use crate::pipeline::{PipelineBuilder, ReviewCoordinator};
use crate::quality::QualityPolicy;
use crate::testing::{ScriptedGenerator, SlowGenerator};
use std::sync::Arc;
use std::time::Duration;

fn login_steps() -> StageResult {
    StageResult::Steps(vec![
        FlowStep::new("user", "submit email and password", "credentials received"),
        FlowStep::new("system", "verify credentials against the account store", "credentials match"),
        FlowStep::new("system", "issue a session token", "user is signed in"),
    ])
}

fn business_findings() -> StageResult {
    StageResult::Findings(vec![
        Finding::new(
            "account locked after repeated failures",
            "five wrong passwords in a row",
            Severity::High,
            "lock the account and require a reset",
        ),
        Finding::new(
            "expired password at sign-in",
            "password older than the rotation policy",
            Severity::Medium,
            "force a password change before issuing a session",
        ),
        Finding::new(
            "sign-in from a deactivated account",
            "account closed by support",
            Severity::High,
            "reject with a dedicated closed-account message",
        ),
        Finding::new(
            "duplicate registration with the same email",
            "sign-up submitted twice",
            Severity::Medium,
            "treat email as unique and surface the conflict",
        ),
        Finding::new(
            "minor attempting an age-restricted sign-up",
            "birthdate below the minimum age",
            Severity::Critical,
            "block registration and explain the policy",
        ),
    ])
}

fn technical_findings() -> StageResult {
    StageResult::Findings(vec![
        Finding::new(
            "credential store times out under load",
            "database timeout during peak traffic",
            Severity::Critical,
            "add a read replica and a circuit breaker",
        ),
        Finding::new(
            "session cache eviction storm",
            "caching layer restarts mid-deploy",
            Severity::High,
            "warm the cache before shifting traffic",
        ),
        Finding::new(
            "token signing key rotation race",
            "concurrency between rotation and issuance",
            Severity::High,
            "overlap validity windows for both keys",
        ),
        Finding::new(
            "connection pool exhaustion",
            "slow queries hold connections too long",
            Severity::Medium,
            "bound query time and size the pool explicitly",
        ),
        Finding::new(
            "replayed sign-in request",
            "network retry duplicates the request",
            Severity::Medium,
            "make session issuance idempotent per nonce",
        ),
    ])
}

fn happy_spec() -> StageSpec {
    StageSpec::new("happy_path", StagePhase::HappyPath, ResultShape::steps(3))
}

fn business_spec() -> StageSpec {
    StageSpec::new("business", StagePhase::Exception, ResultShape::findings(5))
        .with_dependency("happy_path")
        .with_rule(ContentRule::ForbidKeywords {
            vocabulary: QualityPolicy::default().technical_keyword_vocabulary,
        })
}

fn technical_spec() -> StageSpec {
    StageSpec::new("technical", StagePhase::Exception, ResultShape::findings(5))
        .with_dependency("happy_path")
        .with_rule(ContentRule::DistinctFrom {
            stage: "business".to_string(),
        })
}

#[tokio::test]
async fn test_sequential_run_produces_publishable_report() {
    let happy = Arc::new(ScriptedGenerator::new("happy_path"));
    happy.push_ok(login_steps());
    let business = Arc::new(ScriptedGenerator::new("business"));
    business.push_ok(business_findings());
    let technical = Arc::new(ScriptedGenerator::new("technical"));
    technical.push_ok(technical_findings());

    let pipeline = PipelineBuilder::new("login-analysis")
        .stage(happy_spec(), happy)
        .unwrap()
        .stage(business_spec(), business)
        .unwrap()
        .stage(
            technical_spec().with_dependency("business"),
            technical,
        )
        .unwrap()
        .with_overlap_between("business", "technical")
        .build()
        .unwrap();

    let report = pipeline.run("login system").await.unwrap();

    assert!(report.publishable);
    assert_eq!(report.verdicts.len(), 3);
    assert!(report.overlap_violations.is_empty());
    assert!(report.vague_findings.is_empty());
    assert_eq!(report.scores.len(), 4);
    assert!(report.scores.iter().all(|score| score.passed));
}

#[tokio::test]
async fn test_business_stage_below_minimum_exhausts_after_three_attempts() {
    let happy = Arc::new(ScriptedGenerator::new("happy_path"));
    happy.push_ok(login_steps());

    // Two findings per attempt, never reaching the minimum of five.
    let business = Arc::new(ScriptedGenerator::new("business"));
    for _ in 0..3 {
        business.push_ok(StageResult::Findings(vec![
            Finding::new(
                "account locked after repeated failures",
                "five wrong passwords",
                Severity::High,
                "lock and reset",
            ),
            Finding::new(
                "expired password at sign-in",
                "stale password",
                Severity::Medium,
                "force a change",
            ),
        ]));
    }

    let pipeline = PipelineBuilder::new("login-analysis")
        .stage(happy_spec(), happy)
        .unwrap()
        .stage(business_spec(), business.clone())
        .unwrap()
        .build()
        .unwrap();

    let err = pipeline.run("login system").await.unwrap_err();

    match err {
        PipelineError::Exhausted(exhausted) => {
            assert_eq!(exhausted.stage, "business");
            assert_eq!(exhausted.attempts.len(), 3);
            // Every attempt's reasons survive for diagnosis.
            assert!(exhausted
                .all_reasons()
                .iter()
                .all(|reason| reason.contains("at least 5")));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(business.call_count(), 3);
}

#[tokio::test]
async fn test_keyword_drift_is_rejected_then_corrected() {
    let happy = Arc::new(ScriptedGenerator::new("happy_path"));
    happy.push_ok(login_steps());

    let business = Arc::new(ScriptedGenerator::new("business"));
    // First attempt drifts into infrastructure concerns.
    let mut drifted = business_findings();
    if let StageResult::Findings(ref mut findings) = drifted {
        findings[0] = Finding::new(
            "database outage blocks sign-in",
            "primary database down",
            Severity::Critical,
            "fail over",
        );
    }
    business.push_ok(drifted);
    business.push_ok(business_findings());

    let pipeline = PipelineBuilder::new("login-analysis")
        .stage(happy_spec(), happy)
        .unwrap()
        .stage(business_spec(), business.clone())
        .unwrap()
        .build()
        .unwrap();

    let report = pipeline.run("login system").await.unwrap();

    assert!(report.publishable);
    let verdict = report
        .verdicts
        .iter()
        .find(|v| v.stage == "business")
        .unwrap();
    assert_eq!(verdict.attempts, 2);
    assert!(verdict.reasons[0].contains("forbidden keyword"));

    // The corrective attempt received the rejection as feedback.
    let second_request = &business.recorded_requests()[1];
    assert!(second_request.feedback.is_some());
}

#[tokio::test]
async fn test_delegating_run_with_skip_still_reports() {
    let happy = Arc::new(ScriptedGenerator::new("happy_path"));
    happy.push_ok(login_steps());
    let business = Arc::new(ScriptedGenerator::new("business"));
    business.push_ok(business_findings());
    let technical = Arc::new(ScriptedGenerator::new("technical"));
    technical.push_ok(technical_findings());

    // The enrichment stage never produces enough findings.
    let enrichment = Arc::new(ScriptedGenerator::new("enrichment"));
    for _ in 0..6 {
        enrichment.push_ok(StageResult::Findings(vec![Finding::new(
            "observation only",
            "n/a",
            Severity::Low,
            "none",
        )]));
    }

    let coordinator = ReviewCoordinator::new().with_non_essential("enrichment");

    let pipeline = PipelineBuilder::new("login-analysis")
        .stage(happy_spec(), happy)
        .unwrap()
        .stage(business_spec(), business)
        .unwrap()
        .stage(technical_spec(), technical)
        .unwrap()
        .stage(
            StageSpec::new("enrichment", StagePhase::Exception, ResultShape::findings(5))
                .with_dependency("happy_path"),
            enrichment,
        )
        .unwrap()
        .with_overlap_between("business", "technical")
        .delegating(Arc::new(coordinator))
        .build()
        .unwrap();

    let report = pipeline.run("login system").await.unwrap();

    // The skip is advisory and visible; the rest of the run stands alone.
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].stage, "enrichment");
    assert!(report.publishable);
}

#[tokio::test(start_paused = true)]
async fn test_slow_collaborator_hits_timeout_and_terminates_run() {
    let happy_inner = Arc::new(ScriptedGenerator::new("happy_path"));
    happy_inner.push_ok(login_steps());
    let happy: Arc<dyn Generator> = Arc::new(SlowGenerator::new(
        Duration::from_secs(120),
        happy_inner,
    ));

    let pipeline = PipelineBuilder::new("login-analysis")
        .stage(happy_spec(), happy)
        .unwrap()
        .with_policy(QualityPolicy::default().with_per_stage_timeout(Duration::from_secs(1)))
        .build()
        .unwrap();

    let err = pipeline.run("login system").await.unwrap_err();

    match err {
        PipelineError::Unavailable(unavailable) => {
            assert_eq!(unavailable.stage, "happy_path");
            assert!(matches!(
                unavailable.last_error,
                GenerationError::TimedOut(_)
            ));
        }
        other => panic!("expected unavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failure_cancels_concurrent_stage_before_returning() {
    let happy = Arc::new(ScriptedGenerator::new("happy_path"));
    happy.push_ok(login_steps());

    // business fails outright; technical would take a very long time.
    let business = Arc::new(ScriptedGenerator::new("business"));
    for _ in 0..3 {
        business.push_err(GenerationError::Collaborator("model offline".to_string()));
    }
    let technical_inner = Arc::new(ScriptedGenerator::new("technical"));
    technical_inner.push_ok(technical_findings());
    let technical: Arc<dyn Generator> = Arc::new(SlowGenerator::new(
        Duration::from_secs(3600),
        technical_inner,
    ));

    let pipeline = PipelineBuilder::new("login-analysis")
        .stage(happy_spec(), happy)
        .unwrap()
        .stage(business_spec(), business)
        .unwrap()
        .stage(technical_spec(), technical)
        .unwrap()
        .delegating(Arc::new(ReviewCoordinator::new().without_reprompt()))
        .build()
        .unwrap();

    let started = std::time::Instant::now();
    let err = tokio::time::timeout(Duration::from_secs(30), pipeline.run("login system"))
        .await
        .expect("run must return promptly after cancelling the slow stage")
        .unwrap_err();

    assert!(matches!(err, PipelineError::Unavailable(_)));
    // Wall-clock sanity: the hour-long sleep was cancelled, not awaited.
    assert!(started.elapsed() < Duration::from_secs(30));
}
