//! Ollama LLM Provider
//!
//! Local models served by Ollama (default http://localhost:11434). No key is
//! needed. Requests set `format: "json"` so the model is constrained to a
//! JSON reply, which is what the planner asks for anyway.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{LLMError, LLMProvider, Message, MessageRole, Result};
use crate::secrets::SecretManager;

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl OllamaProvider {
    /// `base_url` without the `/api` suffix, e.g. "http://localhost:11434"
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: 0.1,
            client: Client::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn chat_request<'a>(&'a self, messages: &'a [Message]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            stream: false,
            format: "json",
            options: ChatOptions {
                temperature: self.temperature,
            },
        }
    }

    fn status_error(&self, status: StatusCode, body: &str) -> LLMError {
        let body = SecretManager::scrub(body.trim());
        match status {
            StatusCode::NOT_FOUND => LLMError::InvalidRequest(format!(
                "Model '{}' is not pulled on this Ollama server: {}",
                self.model, body
            )),
            s if s.is_server_error() => {
                LLMError::ProviderUnavailable(format!("Ollama returned {}: {}", s, body))
            }
            s => LLMError::InvalidRequest(format!("Ollama returned {}: {}", s, body)),
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let request = self.chat_request(messages);
        tracing::debug!(
            "Ollama request: model={}, {} message(s)",
            self.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else if e.is_connect() {
                    LLMError::ProviderUnavailable(format!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.base_url
                    ))
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.status_error(status, &body));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::Malformed(format!("Unexpected Ollama response: {}", e)))?;

        if reply.message.content.trim().is_empty() {
            return Err(LLMError::Malformed("Ollama returned an empty reply".to_string()));
        }
        Ok(reply.message.content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    format: &'static str,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}
