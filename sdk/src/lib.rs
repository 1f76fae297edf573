//! Opsagent SDK
//!
//! Shared library providing the tool trait, argument/schema types and error
//! types. Used by the engine and by anything that implements a tool.

/// Tool trait
pub mod tool;

/// Error types and handling
pub mod errors;

/// Tool argument, schema and error types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, ErrorExt};
pub use tool::Tool;
pub use types::{
    ParamType, ParameterSchema, ParameterSpec, SchemaViolation, ToolArgs, ToolDescriptor,
    ToolError, ToolErrorReason,
};
