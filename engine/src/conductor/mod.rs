//! Conductor System
//!
//! The task pipeline: planning, step execution with retries, verification,
//! and the orchestrator that binds them.

pub mod executor;
pub mod orchestrator;
pub mod planner;
pub mod retry;
pub mod types;
pub mod verifier;

pub use executor::Executor;
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use planner::{fallback_plan, PlanParseError, Planner};
pub use retry::{AttemptState, RetryMachine, RetryPolicy};
pub use types::{
    ExecutionTrace, Plan, PlanSource, PlanStep, StepError, StepErrorReason, StepResult,
    StepStatus, TaskResult, TaskSummary, VerificationReport,
};
pub use verifier::Verifier;
