//! Conductor data types
//!
//! Everything that flows between planner, executor, verifier and the front
//! ends. All of it is plain serde data; a task result serialises as-is for
//! `--json` output and the `/task/full` endpoint.

use chrono::{DateTime, Utc};
use sdk::{ToolArgs, ToolErrorReason};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One tool invocation in a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Zero-based position in the plan
    pub index: usize,
    pub tool_name: String,
    pub arguments: ToolArgs,
    pub description: String,
    /// Indices of earlier steps that must succeed before this one runs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<usize>,
}

impl PlanStep {
    pub fn new(
        index: usize,
        tool_name: impl Into<String>,
        arguments: ToolArgs,
        description: impl Into<String>,
    ) -> Self {
        Self {
            index,
            tool_name: tool_name.into(),
            arguments,
            description: description.into(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_depends_on(mut self, depends_on: Vec<usize>) -> Self {
        self.depends_on = depends_on;
        self
    }
}

/// Where a plan came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanSource {
    Llm,
    Fallback,
}

/// Ordered list of steps for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub task: String,
    pub steps: Vec<PlanStep>,
    pub source: PlanSource,
    pub reasoning: String,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.tool_name.as_str()).collect()
    }
}

/// Terminal outcome of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Succeeded,
    Failed,
    /// Not invoked because a dependency did not succeed
    Skipped,
}

/// Why a step did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepErrorReason {
    InvalidInput,
    NotFound,
    RateLimited,
    UpstreamUnavailable,
    Timeout,
    Unknown,
    UnknownTool,
    DependencyFailed,
}

impl StepErrorReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid-input",
            Self::NotFound => "not-found",
            Self::RateLimited => "rate-limited",
            Self::UpstreamUnavailable => "upstream-unavailable",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
            Self::UnknownTool => "unknown-tool",
            Self::DependencyFailed => "dependency-failed",
        }
    }
}

impl From<ToolErrorReason> for StepErrorReason {
    fn from(reason: ToolErrorReason) -> Self {
        match reason {
            ToolErrorReason::InvalidInput => Self::InvalidInput,
            ToolErrorReason::NotFound => Self::NotFound,
            ToolErrorReason::RateLimited => Self::RateLimited,
            ToolErrorReason::UpstreamUnavailable => Self::UpstreamUnavailable,
            ToolErrorReason::Timeout => Self::Timeout,
            ToolErrorReason::Unknown => Self::Unknown,
        }
    }
}

impl std::fmt::Display for StepErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    pub reason: StepErrorReason,
    pub message: String,
}

impl From<sdk::ToolError> for StepError {
    fn from(err: sdk::ToolError) -> Self {
        Self {
            reason: err.reason.into(),
            message: err.message,
        }
    }
}

/// What happened to one plan step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: PlanStep,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
    /// Tool invocations made; 0 when the step never reached the tool
    pub attempts: u32,
    pub elapsed_ms: u64,
    /// Backoff delays slept between attempts, in order
    #[serde(default)]
    pub backoff_delays_ms: Vec<u64>,
}

impl StepResult {
    pub fn succeeded(&self) -> bool {
        self.status == StepStatus::Succeeded
    }
}

/// Step results in plan order, one per step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionTrace {
    pub results: Vec<StepResult>,
}

impl ExecutionTrace {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded_count(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded()).count()
    }

    pub fn get(&self, index: usize) -> Option<&StepResult> {
        self.results.get(index)
    }
}

/// Verifier output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Fraction of steps that succeeded, in [0, 1]
    pub completeness_score: f64,
    pub issues: Vec<String>,
    /// Human-readable answer
    pub formatted_response: String,
    /// One-line headline
    pub summary: String,
    /// Tool category -> key facts
    pub structured_summary: BTreeMap<String, Value>,
}

/// Everything known about one task run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub id: Uuid,
    pub task: String,
    pub created_at: DateTime<Utc>,
    pub plan: Plan,
    pub trace: ExecutionTrace,
    pub report: VerificationReport,
    pub total_elapsed_ms: u64,
    pub success: bool,
    /// Pipeline passes run, 2 when a retry happened
    pub passes: u32,
}

impl TaskResult {
    pub fn summary(&self) -> TaskSummary {
        TaskSummary::from(self)
    }
}

/// Condensed view of a [`TaskResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: Uuid,
    pub success: bool,
    pub task: String,
    pub summary: String,
    pub formatted_response: String,
    pub total_time_ms: u64,
    pub plan_steps: usize,
    pub completed_steps: usize,
    pub completeness_score: f64,
}

impl From<&TaskResult> for TaskSummary {
    fn from(result: &TaskResult) -> Self {
        Self {
            id: result.id,
            success: result.success,
            task: result.task.clone(),
            summary: result.report.summary.clone(),
            formatted_response: result.report.formatted_response.clone(),
            total_time_ms: result.total_elapsed_ms,
            plan_steps: result.plan.len(),
            completed_steps: result.trace.succeeded_count(),
            completeness_score: result.report.completeness_score,
        }
    }
}
