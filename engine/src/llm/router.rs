//! LLM Router
//!
//! Orders the configured providers (the user's default first, then the rest
//! in registration order) and tries them one by one, each bounded by a
//! timeout, until one answers.

use super::{LLMError, LLMProvider, Message};
use async_trait::async_trait;
use std::time::Duration;

/// LLM Router with preference ordering and failover
pub struct LLMRouter {
    /// Available LLM providers, already in preference order
    providers: Vec<Box<dyn LLMProvider>>,

    /// Upper bound for a single provider call
    timeout: Duration,
}

impl LLMRouter {
    /// Create a new LLM router
    ///
    /// # Arguments
    /// * `providers` - List of available LLM providers
    /// * `default_provider` - Name of the provider to try first
    /// * `timeout` - Per-provider timeout
    pub fn new(
        mut providers: Vec<Box<dyn LLMProvider>>,
        default_provider: &str,
        timeout: Duration,
    ) -> Self {
        // Stable sort keeps registration order among the non-default providers
        providers.sort_by_key(|p| p.name() != default_provider);
        Self { providers, timeout }
    }

    /// Provider names in the order they will be tried
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Call LLM providers with automatic failover
    ///
    /// Returns the reply together with the name of the provider that produced it.
    pub async fn call(&self, messages: &[Message]) -> super::Result<(String, String)> {
        if self.providers.is_empty() {
            return Err(LLMError::ProviderUnavailable(
                "No LLM providers configured".to_string(),
            ));
        }

        let mut last_error = None;

        for provider in &self.providers {
            tracing::debug!(
                "Attempting provider: {} (timeout: {}s)",
                provider.name(),
                self.timeout.as_secs()
            );

            let result = tokio::time::timeout(self.timeout, provider.generate(messages)).await;

            match result {
                Ok(Ok(response)) => {
                    tracing::info!("Provider {} succeeded", provider.name());
                    return Ok((response, provider.name().to_string()));
                }
                Ok(Err(e)) => {
                    tracing::warn!("Provider {} failed: {}", provider.name(), e);
                    last_error = Some(e);
                }
                Err(_) => {
                    tracing::warn!(
                        "Provider {} timed out after {:?}",
                        provider.name(),
                        self.timeout
                    );
                    last_error = Some(LLMError::Timeout);
                }
            }
        }

        tracing::error!("All LLM providers exhausted");

        // A single provider keeps its own failure class
        match (self.providers.len(), last_error) {
            (1, Some(e)) => Err(e),
            (_, last) => Err(LLMError::ProviderUnavailable(format!(
                "All LLM providers failed (last error: {})",
                last.map(|e| e.to_string()).unwrap_or_default()
            ))),
        }
    }
}

#[async_trait]
impl LLMProvider for LLMRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn generate(&self, messages: &[Message]) -> super::Result<String> {
        self.call(messages).await.map(|(response, _)| response)
    }
}
