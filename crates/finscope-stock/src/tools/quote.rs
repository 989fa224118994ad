//! Tool exposing fetch-and-extract

use async_trait::async_trait;
use finscope_tools::{Result as ToolResult, Tool, ToolError};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::service::StockService;

/// Fetches a quote page and returns the extracted record as a report
pub struct QuoteTool {
    service: StockService,
}

#[derive(Debug, Deserialize)]
struct QuoteParams {
    symbol: String,
}

impl QuoteTool {
    pub fn new(service: StockService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for QuoteTool {
    async fn execute(&self, params: Value) -> ToolResult<Value> {
        let params: QuoteParams = serde_json::from_value(params)?;
        let report = self.service.quote(&params.symbol).await;
        serde_json::to_value(report).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
    }

    fn name(&self) -> &str {
        "stock_quote"
    }

    fn description(&self) -> &str {
        "Fetch the current quote page for a ticker and extract price, change, range, \
         volume, market cap and valuation fields. Fields that cannot be found are listed \
         as absent; the `success` flag tells a partial quote apart from a failed fetch."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "Stock ticker symbol, e.g. AAPL or BRK-B"
                }
            },
            "required": ["symbol"]
        })
    }
}
