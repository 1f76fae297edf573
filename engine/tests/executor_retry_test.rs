//! Integration tests for step retries and backoff
//!
//! Time is paused so backoff sleeps complete instantly while still being
//! measured by the executor.

use async_trait::async_trait;
use opsagent_engine::conductor::{
    Executor, Plan, PlanSource, PlanStep, RetryPolicy, StepErrorReason, StepStatus,
};
use opsagent_engine::tools::ToolRegistry;
use sdk::{ParameterSchema, Tool, ToolArgs, ToolError};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Fails with `error` for the first `failures` calls, then succeeds
struct CountingTool {
    name: &'static str,
    failures: u32,
    error: ToolError,
    calls: AtomicU32,
}

impl CountingTool {
    fn new(name: &'static str, failures: u32, error: ToolError) -> Arc<Self> {
        Arc::new(Self {
            name,
            failures,
            error,
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "counting"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::default()
    }

    async fn invoke(&self, _args: &ToolArgs) -> Result<Value, ToolError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(self.error.clone())
        } else {
            Ok(json!({"call": call + 1}))
        }
    }
}

/// Never answers within any reasonable timeout
struct HangingTool;

#[async_trait]
impl Tool for HangingTool {
    fn name(&self) -> &str {
        "hanging"
    }

    fn description(&self) -> &str {
        "hangs"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::default()
    }

    async fn invoke(&self, _args: &ToolArgs) -> Result<Value, ToolError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Value::Null)
    }
}

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(500),
        max_delay: Duration::from_millis(4_000),
    }
}

fn executor(tools: Vec<Arc<dyn Tool>>) -> Executor {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool).unwrap();
    }
    Executor::new(Arc::new(registry), policy(), Duration::from_secs(30))
}

fn single_step(tool: &str) -> Plan {
    Plan {
        task: "retry test".to_string(),
        steps: vec![PlanStep::new(0, tool, ToolArgs::new(), "")],
        source: PlanSource::Llm,
        reasoning: String::new(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_always_transient_exhausts_three_attempts() {
    let tool = CountingTool::new("flaky", u32::MAX, ToolError::upstream_unavailable("502"));
    let trace = executor(vec![tool.clone()])
        .execute(&single_step("flaky"))
        .await;

    let result = &trace.results[0];
    assert_eq!(result.status, StepStatus::Failed);
    assert_eq!(result.attempts, 3);
    assert_eq!(tool.calls(), 3);
    assert_eq!(
        result.error.as_ref().unwrap().reason,
        StepErrorReason::UpstreamUnavailable
    );

    assert_eq!(result.backoff_delays_ms, vec![500, 1_000]);
    assert!(result
        .backoff_delays_ms
        .windows(2)
        .all(|pair| pair[0] < pair[1]));
    assert!(result.elapsed_ms >= 1_500);
}

#[tokio::test(start_paused = true)]
async fn test_non_transient_error_is_not_retried() {
    let tool = CountingTool::new("strict", u32::MAX, ToolError::invalid_input("bad query"));
    let trace = executor(vec![tool.clone()])
        .execute(&single_step("strict"))
        .await;

    let result = &trace.results[0];
    assert_eq!(result.status, StepStatus::Failed);
    assert_eq!(result.attempts, 1);
    assert_eq!(tool.calls(), 1);
    assert!(result.backoff_delays_ms.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_transient_then_success() {
    let tool = CountingTool::new("recovering", 2, ToolError::rate_limited("429"));
    let trace = executor(vec![tool.clone()])
        .execute(&single_step("recovering"))
        .await;

    let result = &trace.results[0];
    assert_eq!(result.status, StepStatus::Succeeded);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.output, Some(json!({"call": 3})));
    assert!(result.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_hanging_tool_times_out_and_retries() {
    let trace = executor(vec![Arc::new(HangingTool)])
        .execute(&single_step("hanging"))
        .await;

    let result = &trace.results[0];
    assert_eq!(result.status, StepStatus::Failed);
    assert_eq!(result.attempts, 3);
    assert_eq!(
        result.error.as_ref().unwrap().reason,
        StepErrorReason::Timeout
    );
}

#[tokio::test(start_paused = true)]
async fn test_sub_second_timeout_is_reported_exactly() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(HangingTool)).unwrap();
    let executor = Executor::new(Arc::new(registry), policy(), Duration::from_millis(250));

    let trace = executor.execute(&single_step("hanging")).await;

    let error = trace.results[0].error.as_ref().unwrap();
    assert_eq!(error.reason, StepErrorReason::Timeout);
    assert!(error.message.contains("250ms"), "{}", error.message);
}

#[tokio::test(start_paused = true)]
async fn test_failure_does_not_stop_later_steps() {
    let broken = CountingTool::new("broken", u32::MAX, ToolError::not_found("gone"));
    let fine = CountingTool::new("fine", 0, ToolError::unknown("unused"));

    let plan = Plan {
        task: "mixed".to_string(),
        steps: vec![
            PlanStep::new(0, "broken", ToolArgs::new(), ""),
            PlanStep::new(1, "missing", ToolArgs::new(), ""),
            PlanStep::new(2, "fine", ToolArgs::new(), ""),
        ],
        source: PlanSource::Llm,
        reasoning: String::new(),
    };

    let trace = executor(vec![broken, fine]).execute(&plan).await;

    assert_eq!(trace.len(), 3);
    assert_eq!(trace.results[0].status, StepStatus::Failed);
    assert_eq!(trace.results[1].status, StepStatus::Failed);
    assert_eq!(
        trace.results[1].error.as_ref().unwrap().reason,
        StepErrorReason::UnknownTool
    );
    assert_eq!(trace.results[1].attempts, 0);
    assert_eq!(trace.results[2].status, StepStatus::Succeeded);
    for (i, result) in trace.results.iter().enumerate() {
        assert_eq!(result.step.index, i);
    }
}
