//! # Stagegate
//!
//! An orchestrator for generator-backed analysis pipelines.
//!
//! Stagegate runs a small pipeline of dependent analysis stages (a happy
//! path stage followed by exception/edge-case stages) where each stage's
//! content comes from an external black-box generator. The orchestrator
//! enforces that every result meets structural and content-quality criteria
//! before downstream stages may consume it:
//!
//! - **Stage contracts**: per-stage shape descriptors and content rules
//! - **Validation gating**: deterministic structural and content checks
//! - **Bounded retry with feedback**: rejected attempts feed typed feedback
//!   into the next generation request
//! - **Sequential and delegating execution**: a fixed chain, or dynamic
//!   scheduling over a dependency graph with bounded parallelism
//! - **Overlap detection**: duplicate and miscategorized findings across
//!   two result sets
//! - **Quality gate**: one aggregate publish/reject verdict
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagegate::prelude::*;
//!
//! let pipeline = PipelineBuilder::new("login-analysis")
//!     .stage(happy_path_spec, happy_path_generator)?
//!     .stage(business_spec, business_generator)?
//!     .stage(technical_spec, technical_generator)?
//!     .with_overlap_between("business", "technical")
//!     .build()?;
//!
//! let report = pipeline.run("login system").await?;
//! assert!(report.publishable);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod context;
pub mod contract;
pub mod core;
pub mod errors;
pub mod generate;
pub mod observability;
pub mod overlap;
pub mod pipeline;
pub mod quality;
pub mod retry;
pub mod testing;
pub mod validate;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::context::{Context, ContextSnapshot, RunIdentity};
    pub use crate::contract::{ContentRule, ResultShape, StageSpec};
    pub use crate::core::{
        Feedback, Finding, FlowStep, ResultKind, Severity, StagePhase, StageResult,
        StageStatus, ValidationOutcome,
    };
    pub use crate::errors::{
        ContextConflictError, GenerationError, PipelineBuildError, PipelineDeadlockError,
        PipelineError, StageExhaustedError, StageUnavailableError,
    };
    pub use crate::generate::{FnGenerator, GenerationRequest, Generator};
    pub use crate::overlap::{detect_overlap, OverlapCheck};
    pub use crate::pipeline::{
        Coordinator, DelegatingExecutor, GreedyCoordinator, Pipeline, PipelineBuilder,
        PipelineMode, ReviewCoordinator, ReviewDecision, ReviewPass, RunRecord,
        SequentialExecutor, SkipAdvisory, StageExecution,
    };
    pub use crate::quality::{
        QualityGate, QualityGateReport, QualityPolicy, ScoreEntry, StageVerdict,
    };
    pub use crate::retry::{
        BackoffStrategy, JitterStrategy, RetryConfig, RetryController, StageAcceptance,
        StageFailure,
    };
    pub use crate::validate::ValidationEngine;
}
