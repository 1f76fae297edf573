//! Tool trait
//!
//! Every capability the executor can call implements [`Tool`]. Implementations
//! own their transport; the engine only sees arguments in, JSON or a
//! [`ToolError`] out.

use crate::types::{ParameterSchema, ToolArgs, ToolDescriptor, ToolError};
use async_trait::async_trait;

/// Trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the planner refers to the tool by
    fn name(&self) -> &str;

    /// Human-readable description advertised to the planner
    fn description(&self) -> &str;

    /// Declared parameters
    fn parameters(&self) -> ParameterSchema;

    /// Invoke the tool. This is the only place network I/O happens.
    async fn invoke(&self, args: &ToolArgs) -> Result<serde_json::Value, ToolError>;

    /// Name, description and schema bundled together
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}
