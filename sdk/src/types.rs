//! Tool input/output types
//!
//! Arguments, parameter schemas and the structured error every tool returns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Arguments passed to a tool invocation, keyed by parameter name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolArgs {
    pub params: BTreeMap<String, serde_json::Value>,
}

impl ToolArgs {
    /// Create an empty argument set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Get a required string parameter
    pub fn param_str(&self, key: &str) -> Result<&str, ToolError> {
        match self.params.get(key) {
            Some(v) => v.as_str().ok_or_else(|| {
                ToolError::invalid_input(format!("Parameter '{}' must be a string", key))
            }),
            None => Err(ToolError::invalid_input(format!(
                "Missing parameter: {}",
                key
            ))),
        }
    }

    /// Get an optional string parameter
    pub fn param_str_opt(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }

    /// Get an optional i64 parameter
    pub fn param_i64_opt(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(|v| v.as_i64())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl From<BTreeMap<String, serde_json::Value>> for ToolArgs {
    fn from(params: BTreeMap<String, serde_json::Value>) -> Self {
        Self { params }
    }
}

/// Machine-readable failure class of a tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolErrorReason {
    InvalidInput,
    NotFound,
    RateLimited,
    UpstreamUnavailable,
    Timeout,
    Unknown,
}

impl ToolErrorReason {
    /// Transient failures may succeed on retry; the rest never will.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::UpstreamUnavailable | Self::Timeout
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid-input",
            Self::NotFound => "not-found",
            Self::RateLimited => "rate-limited",
            Self::UpstreamUnavailable => "upstream-unavailable",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ToolErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{reason}: {message}")]
pub struct ToolError {
    pub reason: ToolErrorReason,
    pub message: String,
}

impl ToolError {
    pub fn new(reason: ToolErrorReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ToolErrorReason::InvalidInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorReason::NotFound, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ToolErrorReason::RateLimited, message)
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::new(ToolErrorReason::UpstreamUnavailable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ToolErrorReason::Timeout, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ToolErrorReason::Unknown, message)
    }

    pub fn is_transient(&self) -> bool {
        self.reason.is_transient()
    }
}

/// JSON type a parameter value must have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    /// Whether `value` is acceptable for this type.
    ///
    /// Integers are accepted where a number is expected, not the other way round.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParameterSpec {
    pub fn required(
        name: impl Into<String>,
        kind: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(
        name: impl Into<String>,
        kind: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
        }
    }
}

/// Why a set of arguments does not satisfy a schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaViolation {
    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("parameter '{name}' must be of type {expected}")]
    WrongType { name: String, expected: ParamType },
}

/// Declared parameters of a tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSchema {
    pub params: Vec<ParameterSpec>,
}

impl ParameterSchema {
    pub fn new(params: Vec<ParameterSpec>) -> Self {
        Self { params }
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Check `args` against the schema: every required parameter present,
    /// no undeclared parameters, every value of the declared type.
    pub fn validate(&self, args: &ToolArgs) -> Result<(), SchemaViolation> {
        for spec in self.params.iter().filter(|p| p.required) {
            if !args.params.contains_key(&spec.name) {
                return Err(SchemaViolation::MissingParameter(spec.name.clone()));
            }
        }

        for (name, value) in &args.params {
            let spec = self
                .get(name)
                .ok_or_else(|| SchemaViolation::UnknownParameter(name.clone()))?;
            if !spec.kind.accepts(value) {
                return Err(SchemaViolation::WrongType {
                    name: name.clone(),
                    expected: spec.kind,
                });
            }
        }

        Ok(())
    }
}

/// What the planner and front ends see of a registered tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}
