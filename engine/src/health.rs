//! Credential health check
//!
//! Reports which credentials are available without making any network call.
//! The status is `healthy` when at least one LLM provider is usable: an
//! OpenAI key is present, or Ollama is the configured default.

use crate::config::Config;
use crate::secrets::{SecretManager, GITHUB_TOKEN, OPENAI_API_KEY, WEATHER_API_KEY};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub default_provider: String,
    pub openai_configured: bool,
    pub weather_configured: bool,
    pub github_configured: bool,
}

impl HealthReport {
    /// Look up every credential through `secrets`
    pub fn check(config: &Config, secrets: &SecretManager) -> Self {
        Self::from_presence(
            &config.llm.default_provider,
            secrets.has_secret(OPENAI_API_KEY),
            secrets.has_secret(WEATHER_API_KEY),
            secrets.has_secret(GITHUB_TOKEN),
        )
    }

    pub fn from_presence(
        default_provider: &str,
        openai_configured: bool,
        weather_configured: bool,
        github_configured: bool,
    ) -> Self {
        let llm_usable = openai_configured || default_provider == "ollama";
        let status = if llm_usable {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        Self {
            status,
            default_provider: default_provider.to_string(),
            openai_configured,
            weather_configured,
            github_configured,
        }
    }

    /// Human-readable notes for missing credentials
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.status == HealthStatus::Degraded {
            warnings.push(format!(
                "No usable LLM provider: set {} or use ollama as default_provider. Planning falls back to keyword matching.",
                OPENAI_API_KEY
            ));
        }
        if !self.weather_configured {
            warnings.push(format!(
                "{} is not set; the weather tool will fail",
                WEATHER_API_KEY
            ));
        }
        if !self.github_configured {
            warnings.push(format!(
                "{} is not set; GitHub search runs unauthenticated with a lower rate limit",
                GITHUB_TOKEN
            ));
        }
        warnings
    }
}
