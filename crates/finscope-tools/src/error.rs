//! Error types for tool execution

use thiserror::Error;

/// Result type alias for tool execution
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type for tool execution
#[derive(Error, Debug)]
pub enum ToolError {
    /// Input did not match the tool's schema
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// No tool registered under the requested name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The tool ran but could not produce a result
    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::InvalidParams(err.to_string())
    }
}
