//! Conductor Executor
//!
//! Runs plan steps strictly in order. Each step resolves its tool from the
//! registry and invokes it under a timeout, driven by a [`RetryMachine`].
//! A failing step never stops the plan: every step yields exactly one
//! [`StepResult`], so the trace always has the plan's length.

use crate::conductor::retry::{AttemptState, RetryMachine, RetryPolicy};
use crate::conductor::types::{
    ExecutionTrace, Plan, PlanStep, StepError, StepErrorReason, StepResult, StepStatus,
};
use crate::tools::ToolRegistry;
use sdk::ToolError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Executes plan steps against the tool registry
pub struct Executor {
    registry: Arc<ToolRegistry>,
    policy: RetryPolicy,
    tool_timeout: Duration,
}

impl Executor {
    pub fn new(registry: Arc<ToolRegistry>, policy: RetryPolicy, tool_timeout: Duration) -> Self {
        Self {
            registry,
            policy,
            tool_timeout,
        }
    }

    /// Execute every step of `plan` in order
    pub async fn execute(&self, plan: &Plan) -> ExecutionTrace {
        let mut trace = ExecutionTrace::default();

        for step in &plan.steps {
            let result = self.execute_step(step, &trace).await;
            trace.results.push(result);
        }

        info!(
            "Executed {} step(s), {} succeeded",
            trace.len(),
            trace.succeeded_count()
        );
        trace
    }

    /// Execute a single step. `prior` holds the results of the steps before it.
    pub async fn execute_step(&self, step: &PlanStep, prior: &ExecutionTrace) -> StepResult {
        let start = Instant::now();

        if let Some(&dependency) = step
            .depends_on
            .iter()
            .find(|&&d| !prior.get(d).is_some_and(StepResult::succeeded))
        {
            warn!(
                "Skipping step {} ({}): dependency {} did not succeed",
                step.index, step.tool_name, dependency
            );
            return StepResult {
                step: step.clone(),
                status: StepStatus::Skipped,
                output: None,
                error: Some(StepError {
                    reason: StepErrorReason::DependencyFailed,
                    message: format!("Dependency step {} did not succeed", dependency),
                }),
                attempts: 0,
                elapsed_ms: 0,
                backoff_delays_ms: Vec::new(),
            };
        }

        let tool = match self.registry.resolve(&step.tool_name) {
            Ok(tool) => tool,
            Err(e) => {
                return StepResult {
                    step: step.clone(),
                    status: StepStatus::Failed,
                    output: None,
                    error: Some(StepError {
                        reason: StepErrorReason::UnknownTool,
                        message: e.to_string(),
                    }),
                    attempts: 0,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    backoff_delays_ms: Vec::new(),
                };
            }
        };

        let mut machine = RetryMachine::new(self.policy);
        let mut last_error = None;
        let mut output = None;

        while let Some(attempt) = machine.begin_attempt() {
            debug!(
                "Step {} ({}) attempt {}/{}",
                step.index, step.tool_name, attempt, self.policy.max_attempts
            );

            let invocation = tool.invoke(&step.arguments);
            let outcome = match tokio::time::timeout(self.tool_timeout, invocation).await {
                Ok(result) => result,
                Err(_) => Err(ToolError::timeout(format!(
                    "{} did not respond within {:?}",
                    step.tool_name, self.tool_timeout
                ))),
            };

            match outcome {
                Ok(value) => {
                    machine.record_success();
                    output = Some(value);
                }
                Err(err) => {
                    warn!(
                        "Step {} ({}) attempt {} failed: {}",
                        step.index, step.tool_name, attempt, err
                    );
                    let retry_in = machine.record_failure(&err);
                    last_error = Some(err);
                    if let Some(delay) = retry_in {
                        debug!("Retrying step {} in {}ms", step.index, delay.as_millis());
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let attempts = machine.attempts();
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let backoff_delays_ms = machine
            .delays()
            .iter()
            .map(|d| d.as_millis() as u64)
            .collect();

        match machine.state() {
            AttemptState::Succeeded { .. } => {
                info!(
                    "Step {} ({}) succeeded after {} attempt(s) in {}ms",
                    step.index, step.tool_name, attempts, elapsed_ms
                );
                StepResult {
                    step: step.clone(),
                    status: StepStatus::Succeeded,
                    output,
                    error: None,
                    attempts,
                    elapsed_ms,
                    backoff_delays_ms,
                }
            }
            _ => {
                let error = last_error
                    .map(StepError::from)
                    .unwrap_or_else(|| StepError {
                        reason: StepErrorReason::Unknown,
                        message: "Step ended without an outcome".to_string(),
                    });
                warn!(
                    "Step {} ({}) failed after {} attempt(s): {}",
                    step.index, step.tool_name, attempts, error.reason
                );
                StepResult {
                    step: step.clone(),
                    status: StepStatus::Failed,
                    output: None,
                    error: Some(error),
                    attempts,
                    elapsed_ms,
                    backoff_delays_ms,
                }
            }
        }
    }
}
