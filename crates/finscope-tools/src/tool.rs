//! Tool trait definition

use crate::Result;
use async_trait::async_trait;
use serde_json::{Value, json};

/// An operation callable with JSON input and JSON output
///
/// `name` must be unique within a [`ToolRegistry`](crate::ToolRegistry).
/// Failures the caller can fix (a bad symbol, an unknown indicator) come
/// back as [`ToolError::InvalidParams`](crate::ToolError::InvalidParams).
#[async_trait]
pub trait Tool: Send + Sync {
    async fn execute(&self, params: Value) -> Result<Value>;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the `params` object
    fn input_schema(&self) -> Value;

    /// Name, description and schema in the shape tool-call clients expect
    fn definition(&self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "input_schema": self.input_schema(),
        })
    }
}
