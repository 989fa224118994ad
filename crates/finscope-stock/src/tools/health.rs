//! Tool exposing fetch health counters

use async_trait::async_trait;
use finscope_tools::{Result as ToolResult, Tool, ToolError};
use serde_json::{Value, json};

use crate::service::StockService;

/// Reports cumulative fetch attempts, successes and failures by category
pub struct HealthTool {
    service: StockService,
}

impl HealthTool {
    pub fn new(service: StockService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for HealthTool {
    async fn execute(&self, _params: Value) -> ToolResult<Value> {
        serde_json::to_value(self.service.health())
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))
    }

    fn name(&self) -> &str {
        "health_status"
    }

    fn description(&self) -> &str {
        "Report quote fetch health: attempts, successes, failures by category and success rate."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }
}
