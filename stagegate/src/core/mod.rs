//! Core data model: stage results, statuses, and validation outcomes.

mod outcome;
mod result;
mod status;

pub use outcome::{Feedback, ValidationOutcome};
pub use result::{Finding, FlowStep, ResultKind, Severity, StageResult};
pub use status::{StagePhase, StageStatus};
