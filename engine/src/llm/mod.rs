//! LLM Provider Abstraction Layer
//!
//! The planner treats the model as a black box: messages in, text out, or a
//! failure. The [`LLMProvider`] trait is that contract; [`router::LLMRouter`]
//! implements it on top of several providers with timeout and failover, so
//! the planner never knows which backend answered.
//!
//! Providers return raw text. [`extract_json_object`] recovers the JSON object
//! from the forms models actually produce (bare, fenced, or wrapped in prose).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod ollama;
pub mod openai;
pub mod router;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Coarse failure class of an [`LLMError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMErrorKind {
    Timeout,
    Malformed,
    Rejected,
    Unavailable,
}

impl LLMError {
    pub fn kind(&self) -> LLMErrorKind {
        match self {
            Self::Timeout => LLMErrorKind::Timeout,
            Self::Malformed(_) => LLMErrorKind::Malformed,
            Self::AuthenticationFailed(_) | Self::RateLimitExceeded | Self::InvalidRequest(_) => {
                LLMErrorKind::Rejected
            }
            Self::ProviderUnavailable(_) | Self::NetworkError(_) => LLMErrorKind::Unavailable,
        }
    }
}

/// Message in a prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama", "openai")
    fn name(&self) -> &str;

    /// Generate a completion for the given conversation
    ///
    /// # Returns
    /// * `Ok(String)` - The raw text content of the model's reply
    /// * `Err(LLMError)` - If the request fails
    async fn generate(&self, messages: &[Message]) -> Result<String>;
}

/// Extract the first JSON object from model output.
///
/// Handles multiple LLM output formats:
/// 1. Raw JSON: the whole content is an object
/// 2. Fenced JSON (with or without trailing text): ` ```json\n{...}\n``` `
/// 3. An object embedded in prose: the first balanced `{...}`
///
/// Returns `LLMError::Malformed` when none of them yields an object.
pub fn extract_json_object(content: &str) -> Result<serde_json::Value> {
    let trimmed = content.trim();

    if let Some(value) = try_parse_object(trimmed) {
        return Ok(value);
    }

    if let Some(inner) = extract_fenced_json(trimmed) {
        if let Some(value) = try_parse_object(inner.trim()) {
            return Ok(value);
        }
    }

    if let Some(pos) = trimmed.find('{') {
        if let Some(json_str) = extract_balanced_json(&trimmed[pos..]) {
            if let Some(value) = try_parse_object(json_str) {
                return Ok(value);
            }
        }
    }

    Err(LLMError::Malformed(
        "No JSON object found in model output".to_string(),
    ))
}

fn try_parse_object(s: &str) -> Option<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(s).ok()?;
    value.is_object().then_some(value)
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
/// Returns `None` if no fenced block is found.
fn extract_fenced_json(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
