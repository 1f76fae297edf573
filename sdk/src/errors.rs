//! Error types and handling
//!
//! This module provides the error types used by the engine outside the task
//! pipeline itself. Pipeline failures (tool errors, unknown tools, bad plans)
//! are turned into data and never reach these types; `EngineError` covers
//! startup, configuration and front-end failures.
//!
//! All errors implement [`ErrorExt`], which provides a user-friendly hint.

use thiserror::Error;

/// Trait for engine error extensions
///
/// The hint is safe to display to end users and never contains secrets
/// (API keys, tokens) or internal details.
pub trait ErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;
}

/// Main engine error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ErrorExt};
///
/// let error = EngineError::InvalidTask("Task must be at least 3 characters".to_string());
/// assert_eq!(error.to_string(), "Invalid task: Task must be at least 3 characters");
/// assert_eq!(error.user_hint(), "Task must be between 3 and 1000 characters");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Tool registry errors
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Request validation errors
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::UnknownTool(_) => "The requested tool is not available",
            Self::DuplicateTool(_) => "Two tools share the same name. Check tool registration",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::InvalidTask(_) => "Task must be between 3 and 1000 characters",
            Self::Io(_) => "File system operation failed",
        }
    }
}
