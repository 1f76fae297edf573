//! CLI interface for Opsagent
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Opsagent task pipeline
///
/// Turns a natural-language task into a plan of tool calls, executes it with
/// retries, and reports a verified, formatted answer.
#[derive(Parser, Debug)]
#[command(name = "opsagent")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan, execute and verify a task
    Run {
        /// The task to execute
        task: String,

        /// Re-plan once when the first pass is incomplete
        #[arg(long)]
        retry: bool,

        /// Print the full result (plan, trace, report) instead of the summary
        #[arg(long)]
        full: bool,
    },

    /// Start the HTTP API
    Serve {
        /// Listen address, overrides server.bind
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Report which credentials are configured
    Health,

    /// List registered tools and their parameters
    Tools,

    /// Manage API keys stored in the OS keychain
    Secrets {
        #[command(subcommand)]
        action: SecretAction,
    },
}

/// Keychain actions
#[derive(Subcommand, Debug)]
pub enum SecretAction {
    /// Store a key; the value is read from the first line of stdin
    Set {
        /// OPENAI_API_KEY, OPENWEATHERMAP_API_KEY or GITHUB_TOKEN
        key: String,
    },

    /// Remove a key from the keychain
    Delete {
        /// OPENAI_API_KEY, OPENWEATHERMAP_API_KEY or GITHUB_TOKEN
        key: String,
    },
}
