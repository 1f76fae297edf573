//! Example running one task through the full pipeline
//!
//! Uses the default configuration with Ollama as the preferred provider.
//! Without a reachable Ollama (or an OPENAI_API_KEY) the planner falls back
//! to keyword matching, so the example still produces a result.
//!
//! Run with:
//!   OPENWEATHERMAP_API_KEY=... cargo run --example simple_task_example -- "weather in Tokyo"

use opsagent_engine::config::Config;
use opsagent_engine::handlers::build_orchestrator;
use opsagent_engine::secrets::SecretManager;
use opsagent_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry_with_level("info");

    let task = std::env::args().nth(1).unwrap_or_else(|| {
        "Find popular rust web frameworks on GitHub and the weather in Tokyo".to_string()
    });

    let mut config = Config::default();
    config.llm.default_provider = "ollama".to_string();

    let orchestrator = build_orchestrator(&config, &SecretManager::default())?;

    println!("=== Running: {} ===\n", task);
    let result = orchestrator.run(&task, true).await;

    println!("Plan ({:?}):", result.plan.source);
    for step in &result.plan.steps {
        println!("  {}. {} - {}", step.index + 1, step.tool_name, step.description);
    }
    println!();

    for step in &result.trace.results {
        println!(
            "  step {} {:?} after {} attempt(s), {}ms",
            step.step.index + 1,
            step.status,
            step.attempts,
            step.elapsed_ms
        );
    }
    println!();

    println!("{}", result.report.formatted_response);
    println!("\n{}", serde_json::to_string_pretty(&result.summary())?);

    Ok(())
}
