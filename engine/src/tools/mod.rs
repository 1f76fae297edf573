//! Tool registry and built-in tools
//!
//! The registry maps tool names to `Arc<dyn Tool>` trait objects. It is
//! filled once at startup and only read afterwards; the planner lists it to
//! build its prompt and validate plans, the executor resolves from it per step.

pub mod github;
pub mod weather;

pub use github::GithubTool;
pub use weather::WeatherTool;

use sdk::errors::EngineError;
use sdk::{Tool, ToolDescriptor, ToolError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::secrets::SecretManager;

/// Registry of available tools, keyed by name
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry with no tools enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name.
    ///
    /// # Errors
    /// `EngineError::DuplicateTool` if the name is already taken
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), EngineError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(EngineError::DuplicateTool(name));
        }

        debug!("Registered tool '{}'", name);
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by name.
    ///
    /// # Errors
    /// `EngineError::UnknownTool` if nothing is registered under `name`
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, EngineError> {
        self.tools.get(name).cloned().ok_or_else(|| {
            warn!("Unknown tool requested: {}", name);
            EngineError::UnknownTool(name.to_string())
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Descriptors of every registered tool, sorted by name
    pub fn list(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<_> = self.tools.values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Describe the registered tools for the planner prompt.
    ///
    /// One section per tool with its parameters, their types and whether
    /// they are required.
    pub fn describe_for_prompt(&self) -> String {
        let mut parts = Vec::new();

        for descriptor in self.list() {
            parts.push(format!("## {}", descriptor.name));
            parts.push(descriptor.description.clone());
            if descriptor.parameters.params.is_empty() {
                parts.push("Arguments: none".to_string());
            } else {
                parts.push("Arguments:".to_string());
                for param in &descriptor.parameters.params {
                    parts.push(format!(
                        "- {} ({}, {}): {}",
                        param.name,
                        param.kind,
                        if param.required { "required" } else { "optional" },
                        param.description
                    ));
                }
            }
            parts.push(String::new());
        }

        parts.join("\n")
    }
}

/// Map a non-success HTTP status from an upstream API to a tool error
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str, api: &str) -> ToolError {
    let detail = SecretManager::scrub(body.trim());
    let message = if detail.is_empty() {
        format!("{} API returned {}", api, status)
    } else {
        format!("{} API returned {}: {}", api, status, detail)
    };

    match status.as_u16() {
        404 => ToolError::not_found(message),
        400 | 422 => ToolError::invalid_input(message),
        403 | 429 => ToolError::rate_limited(message),
        500..=599 => ToolError::upstream_unavailable(message),
        _ => ToolError::unknown(message),
    }
}

/// Map a transport-level failure to a tool error
pub(crate) fn request_error(err: reqwest::Error, api: &str) -> ToolError {
    let detail = SecretManager::scrub(&err.to_string());
    if err.is_timeout() {
        ToolError::timeout(format!("{} API request timed out", api))
    } else if err.is_connect() || err.is_request() {
        ToolError::upstream_unavailable(format!("Cannot reach {} API: {}", api, detail))
    } else if err.is_decode() {
        ToolError::unknown(format!("Unexpected {} API response: {}", api, detail))
    } else {
        ToolError::unknown(format!("{} API request failed: {}", api, detail))
    }
}
