// Opsagent
// Main entry point for the opsagent binary

use clap::Parser;
use opsagent_engine::cli::{Cli, Command, SecretAction};
use opsagent_engine::config::Config;
use opsagent_engine::handlers::{
    handle_health, handle_run, handle_secret_delete, handle_secret_set, handle_serve,
    handle_tools, OutputFormat,
};
use opsagent_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config file; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Opsagent v{} ({} - {})", version, commit, timestamp);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Run { task, retry, full } => {
            tracing::debug!("Running task (retry={}, full={})", retry, full);
            handle_run(task, retry, full, &config, format).await
        }

        Command::Serve { bind } => handle_serve(bind, &config).await,

        Command::Health => handle_health(&config, format).await,

        Command::Tools => handle_tools(&config, format).await,

        Command::Secrets { action } => match action {
            SecretAction::Set { key } => handle_secret_set(key, format).await,
            SecretAction::Delete { key } => handle_secret_delete(key, format).await,
        },
    }
}
