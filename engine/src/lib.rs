//! Opsagent Engine Library
//!
//! Planner, executor and verifier pipeline over a registry of tools, plus the
//! CLI and HTTP front ends. Used by the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// LLM provider abstraction layer
pub mod llm;

/// Tool registry and built-in tools
pub mod tools;

/// Conductor pipeline: planner, executor, verifier, orchestrator
pub mod conductor;

/// Telemetry and Observability
pub mod telemetry;

/// Credential health check
pub mod health;

/// HTTP API
pub mod server;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
