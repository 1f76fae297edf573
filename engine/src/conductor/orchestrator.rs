//! Conductor Orchestrator
//!
//! Binds planner, executor and verifier into one call that always returns a
//! [`TaskResult`]. Failures anywhere in the pipeline end up as data in the
//! trace and the report, never as an error from [`Orchestrator::run`].

use crate::conductor::executor::Executor;
use crate::conductor::planner::Planner;
use crate::conductor::types::{ExecutionTrace, Plan, TaskResult, VerificationReport};
use crate::conductor::verifier::Verifier;
use crate::config::OrchestratorConfig;
use chrono::Utc;
use tokio::time::Instant;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Success and retry thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorSettings {
    /// Success requires a completeness score strictly above this
    pub min_completeness: f64,
    /// With retry enabled, a pass scoring below this is re-planned once
    pub retry_below: f64,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&OrchestratorConfig::default())
    }
}

impl From<&OrchestratorConfig> for OrchestratorSettings {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            min_completeness: config.min_completeness,
            retry_below: config.retry_below,
        }
    }
}

/// One plan → execute → verify pass
struct Pass {
    plan: Plan,
    trace: ExecutionTrace,
    report: VerificationReport,
}

impl Pass {
    fn score(&self) -> f64 {
        self.report.completeness_score
    }
}

pub struct Orchestrator {
    planner: Planner,
    executor: Executor,
    verifier: Verifier,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        planner: Planner,
        executor: Executor,
        verifier: Verifier,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            planner,
            executor,
            verifier,
            settings,
        }
    }

    pub fn settings(&self) -> OrchestratorSettings {
        self.settings
    }

    /// Run the full pipeline for `task`.
    ///
    /// With `retry_on_failure`, an unsuccessful pass or one scoring below
    /// `retry_below` is followed by exactly one fresh pass, and the better of
    /// the two is returned (the second on a tie).
    pub async fn run(&self, task: &str, retry_on_failure: bool) -> TaskResult {
        let id = Uuid::new_v4();
        let span = tracing::info_span!("task", %id);

        async move {
            let created_at = Utc::now();
            let start = Instant::now();
            info!("Starting task: {}", task);

            let mut best = self.run_pass(task).await;
            let mut passes = 1;

            if retry_on_failure && self.wants_retry(&best) {
                info!(
                    "Score {:.2} below {:.2}, re-planning once",
                    best.score(),
                    self.settings.retry_below
                );
                let second = self.run_pass(task).await;
                passes = 2;
                if second.score() >= best.score() {
                    best = second;
                }
            }

            let success = self.is_success(&best.plan, &best.report);
            let total_elapsed_ms = start.elapsed().as_millis() as u64;

            info!(
                "Task finished: success={}, score={:.2}, passes={}, {}ms",
                success,
                best.score(),
                passes,
                total_elapsed_ms
            );

            TaskResult {
                id,
                task: task.to_string(),
                created_at,
                plan: best.plan,
                trace: best.trace,
                report: best.report,
                total_elapsed_ms,
                success,
                passes,
            }
        }
        .instrument(span)
        .await
    }

    async fn run_pass(&self, task: &str) -> Pass {
        let plan = self.planner.plan(task).await;
        let trace = self.executor.execute(&plan).await;
        let report = self.verifier.verify(&trace);
        Pass {
            plan,
            trace,
            report,
        }
    }

    fn is_success(&self, plan: &Plan, report: &VerificationReport) -> bool {
        !plan.is_empty() && report.completeness_score > self.settings.min_completeness
    }

    fn wants_retry(&self, pass: &Pass) -> bool {
        !self.is_success(&pass.plan, &pass.report) || pass.score() < self.settings.retry_below
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductor::retry::RetryPolicy;
    use crate::llm::{self, LLMError, LLMProvider, Message};
    use crate::tools::ToolRegistry;
    use async_trait::async_trait;
    use sdk::{ParamType, ParameterSchema, ParameterSpec, Tool, ToolArgs, ToolError};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct DownLLM;

    #[async_trait]
    impl LLMProvider for DownLLM {
        fn name(&self) -> &str {
            "down"
        }

        async fn generate(&self, _messages: &[Message]) -> llm::Result<String> {
            Err(LLMError::ProviderUnavailable("offline".into()))
        }
    }

    /// Fails on its first call, succeeds afterwards
    struct FlakyWeather {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Tool for FlakyWeather {
        fn name(&self) -> &str {
            "weather"
        }

        fn description(&self) -> &str {
            "weather"
        }

        fn parameters(&self) -> ParameterSchema {
            ParameterSchema::new(vec![ParameterSpec::required(
                "city",
                ParamType::String,
                "City",
            )])
        }

        async fn invoke(&self, _args: &ToolArgs) -> Result<Value, ToolError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ToolError::not_found("first call fails"))
            } else {
                Ok(json!({"temperature": 21.0, "condition": "sunny"}))
            }
        }
    }

    fn orchestrator(settings: OrchestratorSettings) -> Orchestrator {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(FlakyWeather {
                calls: AtomicUsize::new(0),
            }))
            .unwrap();
        let registry = Arc::new(registry);

        Orchestrator::new(
            Planner::new(Arc::new(DownLLM), registry.clone(), 2),
            Executor::new(registry, RetryPolicy::default(), Duration::from_secs(5)),
            Verifier::new(),
            settings,
        )
    }

    #[tokio::test]
    async fn test_failed_pass_without_retry() {
        let result = orchestrator(OrchestratorSettings::default())
            .run("weather in Paris", false)
            .await;
        assert_eq!(result.passes, 1);
        assert!(!result.success);
        assert_eq!(result.report.completeness_score, 0.0);
    }

    #[tokio::test]
    async fn test_retry_keeps_better_pass() {
        let result = orchestrator(OrchestratorSettings::default())
            .run("weather in Paris", true)
            .await;
        assert_eq!(result.passes, 2);
        assert!(result.success);
        assert_eq!(result.report.completeness_score, 1.0);
        assert_eq!(result.summary().completed_steps, 1);
    }

    #[tokio::test]
    async fn test_empty_plan_is_not_success() {
        let result = orchestrator(OrchestratorSettings::default())
            .run("compose a haiku", false)
            .await;
        assert!(result.plan.is_empty());
        assert_eq!(result.report.completeness_score, 1.0);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_min_completeness_threshold() {
        let strict = OrchestratorSettings {
            min_completeness: 0.99,
            retry_below: 1.0,
        };
        let result = orchestrator(strict).run("weather in Paris", true).await;
        assert!(result.success);

        let impossible = OrchestratorSettings {
            min_completeness: 1.0,
            retry_below: 1.0,
        };
        let result = orchestrator(impossible).run("weather in Paris", true).await;
        assert!(!result.success);
    }
}
