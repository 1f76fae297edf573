//! Command handlers for CLI operations
//!
//! - run: plan, execute and verify a task
//! - serve: start the HTTP API
//! - health: report configured credentials
//! - tools: list registered tools
//! - secrets set/delete: manage keychain entries
//!
//! The `build_*` functions wire config and secrets into the pipeline and are
//! shared by the CLI and the HTTP API.

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroize;

use crate::conductor::{
    Executor, Orchestrator, OrchestratorSettings, Planner, RetryPolicy, Verifier,
};
use crate::config::Config;
use crate::health::{HealthReport, HealthStatus};
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::OpenAIProvider;
use crate::llm::router::LLMRouter;
use crate::llm::LLMProvider;
use crate::secrets::{
    SecretManager, SecretString, GITHUB_TOKEN, KNOWN_SECRETS, OPENAI_API_KEY, WEATHER_API_KEY,
};
use crate::server::{self, AppState};
use crate::tools::github::GithubTool;
use crate::tools::weather::WeatherTool;
use crate::tools::ToolRegistry;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Register the built-in tools
pub fn build_registry(config: &Config, secrets: &SecretManager) -> Result<Arc<ToolRegistry>> {
    let mut registry = ToolRegistry::new();

    let github = GithubTool::new(&config.tools.github, secrets.get_secret(GITHUB_TOKEN))?;
    registry.register(Arc::new(github))?;

    let weather = WeatherTool::new(&config.tools.weather, secrets.get_secret(WEATHER_API_KEY))?;
    registry.register(Arc::new(weather))?;

    tracing::debug!("Registered {} tool(s)", registry.len());
    Ok(Arc::new(registry))
}

/// Build the provider router.
///
/// Ollama needs no key and is always added. OpenAI is added only when its key
/// is available, so a missing key never costs a failing request per task.
pub fn build_router(config: &Config, secrets: &SecretManager) -> LLMRouter {
    let mut providers: Vec<Box<dyn LLMProvider>> = Vec::new();

    providers.push(Box::new(
        OllamaProvider::new(
            config.llm.ollama.base_url.clone(),
            config.llm.ollama.model.clone(),
        )
        .with_temperature(config.llm.temperature),
    ));

    match secrets.get_secret(OPENAI_API_KEY) {
        Some(key) => providers.push(Box::new(
            OpenAIProvider::new(config.llm.openai.clone(), Some(key))
                .with_sampling(config.llm.temperature, config.llm.max_tokens),
        )),
        None => tracing::warn!("{} not set, OpenAI provider disabled", OPENAI_API_KEY),
    }

    let router = LLMRouter::new(
        providers,
        &config.llm.default_provider,
        Duration::from_secs(config.llm.timeout_secs),
    );
    tracing::debug!("LLM providers in order: {:?}", router.provider_names());
    router
}

/// Wire registry, LLM, planner, executor and verifier into an orchestrator
pub fn build_orchestrator(config: &Config, secrets: &SecretManager) -> Result<Orchestrator> {
    let registry = build_registry(config, secrets)?;
    let llm: Arc<dyn LLMProvider> = Arc::new(build_router(config, secrets));

    let planner = Planner::new(llm, registry.clone(), config.llm.plan_attempts);
    let executor = Executor::new(
        registry,
        RetryPolicy::from_config(&config.executor),
        Duration::from_secs(config.executor.tool_timeout_secs),
    );

    Ok(Orchestrator::new(
        planner,
        executor,
        Verifier::new(),
        OrchestratorSettings::from(&config.orchestrator),
    ))
}

/// Run a task and print its result
pub async fn handle_run(
    task: String,
    retry: bool,
    full: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let secrets = SecretManager::default();
    let orchestrator = build_orchestrator(config, &secrets)?;

    let result = orchestrator.run(&task, retry).await;

    match format {
        OutputFormat::Text => {
            if full {
                println!("Plan ({} step(s), {:?}):", result.plan.len(), result.plan.source);
                for step in &result.plan.steps {
                    println!(
                        "  {}. {} {}",
                        step.index + 1,
                        step.tool_name,
                        serde_json::to_string(&step.arguments)?
                    );
                }
                println!();
            }

            println!("{}", result.report.formatted_response);
            println!();

            let summary = result.summary();
            let mark = if summary.success { "✓" } else { "✗" };
            println!("{} {}", mark, summary.summary);
            println!(
                "  Steps: {}/{} succeeded, completeness {:.2}, {}ms",
                summary.completed_steps,
                summary.plan_steps,
                summary.completeness_score,
                summary.total_time_ms
            );
        }
        OutputFormat::Json => {
            let output = if full {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string_pretty(&result.summary())?
            };
            println!("{}", output);
        }
    }

    Ok(())
}

/// Start the HTTP API
pub async fn handle_serve(bind: Option<String>, config: &Config) -> Result<()> {
    let addr: SocketAddr = match bind {
        Some(bind) => bind
            .parse()
            .with_context(|| format!("Invalid listen address '{}'", bind))?,
        None => config.server_addr()?,
    };

    let secrets = SecretManager::default();
    let health = HealthReport::check(config, &secrets);
    if health.status == HealthStatus::Degraded {
        for warning in health.warnings() {
            tracing::warn!("{}", warning);
        }
    }

    let orchestrator = Arc::new(build_orchestrator(config, &secrets)?);
    server::serve(addr, AppState::new(orchestrator, health)).await?;
    Ok(())
}

/// Report which credentials are available
pub async fn handle_health(config: &Config, format: OutputFormat) -> Result<()> {
    let report = HealthReport::check(config, &SecretManager::default());

    match format {
        OutputFormat::Text => {
            println!("Status: {}", report.status);
            println!("Default provider: {}", report.default_provider);
            for (name, configured) in [
                ("OpenAI API key", report.openai_configured),
                ("OpenWeatherMap API key", report.weather_configured),
                ("GitHub token", report.github_configured),
            ] {
                let state = if configured { "Configured" } else { "Not configured" };
                println!("  {:<24} {}", name, state);
            }

            let warnings = report.warnings();
            if !warnings.is_empty() {
                println!();
                for warning in warnings {
                    println!("⚠ {}", warning);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// List the registered tools
pub async fn handle_tools(config: &Config, format: OutputFormat) -> Result<()> {
    let registry = build_registry(config, &SecretManager::default())?;
    let tools = registry.list();

    match format {
        OutputFormat::Text => {
            if tools.is_empty() {
                println!("No tools registered.");
                return Ok(());
            }
            for tool in &tools {
                println!("{}", tool.name);
                println!("  {}", tool.description);
                for param in &tool.parameters.params {
                    println!(
                        "    {} ({}{}): {}",
                        param.name,
                        param.kind,
                        if param.required { ", required" } else { "" },
                        param.description
                    );
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({ "tools": tools });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn known_secret(key: &str) -> Result<&str> {
    match KNOWN_SECRETS.iter().find(|k| k.eq_ignore_ascii_case(key)) {
        Some(known) => Ok(known),
        None => bail!(
            "Unknown secret '{}'. Expected one of: {}",
            key,
            KNOWN_SECRETS.join(", ")
        ),
    }
}

/// Store a secret read from stdin in the keychain
pub async fn handle_secret_set(key: String, format: OutputFormat) -> Result<()> {
    let key = known_secret(&key)?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read secret from stdin")?;
    let value = SecretString::from_input(&line);
    line.zeroize();
    let Some(value) = value else {
        bail!("No value given for {} (pipe it on stdin)", key);
    };

    SecretManager::default().set_secret(key, &value)?;

    match format {
        OutputFormat::Text => println!("✓ Stored {} in the keychain", key),
        OutputFormat::Json => {
            println!("{}", json!({ "key": key, "stored": true }));
        }
    }
    Ok(())
}

/// Remove a secret from the keychain
pub async fn handle_secret_delete(key: String, format: OutputFormat) -> Result<()> {
    let key = known_secret(&key)?;
    SecretManager::default().delete_secret(key)?;

    match format {
        OutputFormat::Text => println!("✓ Removed {} from the keychain", key),
        OutputFormat::Json => {
            println!("{}", json!({ "key": key, "deleted": true }));
        }
    }
    Ok(())
}
