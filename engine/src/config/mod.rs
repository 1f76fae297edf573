//! Configuration management
//!
//! This module handles loading, validation, and management of the Opsagent
//! configuration. Configuration is stored in TOML format at
//! ~/.opsagent/config.toml and every section is optional.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: LLM provider preference, timeouts and planner attempts
//! - **tools**: Base URLs and HTTP timeouts of the GitHub and weather APIs
//! - **executor**: Retry/backoff policy and per-call timeout
//! - **orchestrator**: Success and re-plan thresholds
//! - **server**: HTTP API listen address
//!
//! API keys never live in this file; see [`crate::secrets`].
//!
//! # Examples
//!
//! ```no_run
//! use opsagent_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Default provider: {}", config.llm.default_provider);
//! println!("Max attempts per step: {}", config.executor.max_attempts);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Providers the router knows how to build
pub const KNOWN_PROVIDERS: &[&str] = &["openai", "ollama"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// External API endpoints
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Step execution policy
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// End-to-end pipeline thresholds
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// HTTP API server
    #[serde(default)]
    pub server: ServerConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Provider tried first (openai, ollama)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Per-provider request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// LLM attempts the planner makes before falling back to keyword planning
    #[serde(default = "default_plan_attempts")]
    pub plan_attempts: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion token limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// OpenAI-compatible provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,
    // Note: API key comes from OPENAI_API_KEY or the OS keychain
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// External API endpoints used by the built-in tools
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub github: GithubConfig,

    #[serde(default)]
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_base_url")]
    pub base_url: String,

    /// HTTP client timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// HTTP client timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

/// Step execution policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Total invocations allowed per step, first attempt included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on every further retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Timeout applied to every tool invocation
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
}

/// End-to-end pipeline thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// A task succeeds when its completeness score is strictly above this
    #[serde(default)]
    pub min_completeness: f64,

    /// With retry enabled, a pass scoring below this triggers one re-plan
    #[serde(default = "default_retry_below")]
    pub retry_below: f64,
}

/// HTTP API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_plan_attempts() -> u32 {
    2
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_http_timeout() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    4_000
}

fn default_tool_timeout() -> u64 {
    30
}

fn default_retry_below() -> f64 {
    1.0
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            timeout_secs: default_llm_timeout(),
            plan_attempts: default_plan_attempts(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            openai: OpenAIConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            base_url: default_github_base_url(),
            timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            tool_timeout_secs: default_tool_timeout(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            min_completeness: 0.0,
            retry_below: default_retry_below(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing.
    ///
    /// Default location: ~/.opsagent/config.toml
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load and validate configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to `path` and return it
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        let config = Self::default();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Created default configuration at {:?}", path);
        Ok(config)
    }

    /// Get the default configuration file path
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".opsagent").join("config.toml"))
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), EngineError> {
        if !KNOWN_PROVIDERS.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Unknown LLM provider '{}'. Expected one of: {}",
                self.llm.default_provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.llm.plan_attempts == 0 {
            return Err(EngineError::Config(
                "llm.plan_attempts must be at least 1".to_string(),
            ));
        }

        if self.llm.timeout_secs == 0
            || self.executor.tool_timeout_secs == 0
            || self.tools.github.timeout_secs == 0
            || self.tools.weather.timeout_secs == 0
        {
            return Err(EngineError::Config(
                "Timeouts must be greater than zero".to_string(),
            ));
        }

        if self.executor.max_attempts == 0 {
            return Err(EngineError::Config(
                "executor.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.executor.base_delay_ms > self.executor.max_delay_ms {
            return Err(EngineError::Config(format!(
                "executor.base_delay_ms ({}) exceeds executor.max_delay_ms ({})",
                self.executor.base_delay_ms, self.executor.max_delay_ms
            )));
        }

        // Every backoff delay must be longer than the one before it
        let retries = self.executor.max_attempts.saturating_sub(1);
        if retries >= 2 {
            if self.executor.base_delay_ms == 0 {
                return Err(EngineError::Config(
                    "executor.base_delay_ms must be greater than zero with two or more retries"
                        .to_string(),
                ));
            }
            let last_delay = 2u64
                .checked_pow(retries - 1)
                .and_then(|factor| self.executor.base_delay_ms.checked_mul(factor));
            if last_delay.map_or(true, |ms| ms > self.executor.max_delay_ms) {
                return Err(EngineError::Config(format!(
                    "executor.max_delay_ms ({}) is too small for {} attempts starting at {}ms; \
                     raise it or lower executor.max_attempts",
                    self.executor.max_delay_ms,
                    self.executor.max_attempts,
                    self.executor.base_delay_ms
                )));
            }
        }

        for (name, value) in [
            ("orchestrator.min_completeness", self.orchestrator.min_completeness),
            ("orchestrator.retry_below", self.orchestrator.retry_below),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        self.server_addr()?;
        Ok(())
    }

    /// Parsed HTTP listen address
    pub fn server_addr(&self) -> Result<SocketAddr, EngineError> {
        self.server.bind.parse().map_err(|e| {
            EngineError::Config(format!("Invalid server.bind '{}': {}", self.server.bind, e))
        })
    }
}
