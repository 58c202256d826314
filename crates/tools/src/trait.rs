//! Tool abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single tool the agent can call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get tool name.
    fn name(&self) -> &str;

    /// Get tool description.
    fn description(&self) -> &str;

    /// JSON schema of the tool's arguments object.
    fn input_schema(&self) -> Value;

    /// Execute the tool. The result is the text handed back to the model.
    async fn execute(&self, args: Value) -> Result<String, anyhow::Error>;

    /// Get tool spec (for model discovery).
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Tool executor - lists and runs tools by name.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Tools this executor offers.
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError>;

    /// Execute a tool by name.
    async fn execute_tool(&self, name: &str, args: Value) -> Result<String, ToolError>;
}

/// Tool description handed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name
    pub name: String,

    /// Description
    pub description: String,

    /// JSON schema of the arguments object
    pub input_schema: Value,
}

/// Errors raised while listing or running tools.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No executor offers this tool
    #[error("unknown tool: {0}")]
    Unknown(String),

    /// Arguments did not match the tool's schema
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments {
        /// Tool name
        tool: String,
        /// What was wrong
        reason: String,
    },

    /// The tool ran and reported failure
    #[error("tool {tool} failed: {message}")]
    Failed {
        /// Tool name
        tool: String,
        /// Failure text
        message: String,
    },

    /// The executor could not be reached
    #[error("tool transport error: {0}")]
    Transport(String),
}
