//! Tool for calculating technical indicators

use async_trait::async_trait;
use finscope_tools::{Result as ToolResult, Tool};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::HistoryRange;
use crate::error::Result;
use crate::indicators::IndicatorRequest;
use crate::service::StockService;

/// Computes indicators over a symbol's daily history
pub struct TechnicalIndicatorTool {
    service: StockService,
}

#[derive(Debug, Deserialize)]
struct TechnicalParams {
    symbol: String,
    #[serde(default)]
    range: Option<String>,
    #[serde(default)]
    indicators: Vec<String>,
    /// Include full aligned series, not just the latest values
    #[serde(default)]
    include_series: bool,
}

impl TechnicalIndicatorTool {
    pub fn new(service: StockService) -> Self {
        Self { service }
    }

    async fn calculate(&self, params: TechnicalParams) -> Result<Value> {
        let range = params
            .range
            .as_deref()
            .map(str::parse::<HistoryRange>)
            .transpose()?;
        let requested = params
            .indicators
            .iter()
            .map(|name| name.parse::<IndicatorRequest>())
            .collect::<Result<Vec<_>>>()?;

        let analysis = self
            .service
            .analysis(&params.symbol, range, &requested)
            .await?;
        let set = &analysis.indicators;
        let range = range.unwrap_or(self.service.config().history_range);

        let mut out = json!({
            "symbol": params.symbol.trim().to_uppercase(),
            "range": range,
            "data_points": set.points,
            "latest": set.latest_values(),
        });
        if let Some(rsi) = set.latest("rsi_14") {
            out["rsi_signal"] = json!(interpret_rsi(rsi));
        }
        if let Some(patterns) = &analysis.patterns {
            out["trend"] = serde_json::to_value(&patterns.trend)?;
            out["support_resistance"] = serde_json::to_value(&patterns.support_resistance)?;
        }
        if params.include_series {
            out["series"] = serde_json::to_value(&set.indicators)?;
        }
        Ok(out)
    }
}

/// Interpret RSI value
fn interpret_rsi(rsi: f64) -> &'static str {
    if rsi > 70.0 {
        "overbought"
    } else if rsi < 30.0 {
        "oversold"
    } else {
        "neutral"
    }
}

#[async_trait]
impl Tool for TechnicalIndicatorTool {
    async fn execute(&self, params: Value) -> ToolResult<Value> {
        let params: TechnicalParams = serde_json::from_value(params)?;
        Ok(self.calculate(params).await?)
    }

    fn name(&self) -> &str {
        "technical_indicators"
    }

    fn description(&self) -> &str {
        "Calculate technical indicators from daily price history. \
         Supports SMA, EMA, MACD, RSI, Bollinger Bands, volume average and ratio, \
         price change and volatility, plus trend and support/resistance levels."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "Stock ticker symbol"
                },
                "range": {
                    "type": "string",
                    "description": "Time range for historical data",
                    "enum": ["1mo", "3mo", "6mo", "1y", "2y", "5y", "ytd"],
                    "default": "6mo"
                },
                "indicators": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Indicator names such as sma_20, ema_12, macd, rsi_14, \
                                    bollinger_20, volume_avg_20, volume_ratio_20, change_5d, \
                                    volatility_20. Empty means the standard set."
                },
                "include_series": {
                    "type": "boolean",
                    "description": "Return every aligned value, not just the latest",
                    "default": false
                }
            },
            "required": ["symbol"]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockHistoryProvider;
    use crate::config::StockConfig;
    use crate::fetch::MockPageFetcher;
    use crate::health::HealthCounters;
    use crate::indicators::PriceSeries;
    use finscope_tools::ToolError;
    use std::sync::Arc;

    fn tool(history: MockHistoryProvider) -> TechnicalIndicatorTool {
        let service = StockService::with_parts(
            StockConfig::default(),
            Arc::new(MockPageFetcher::new()),
            Arc::new(history),
            Arc::new(HealthCounters::new()),
        );
        TechnicalIndicatorTool::new(service)
    }

    fn rising_history() -> MockHistoryProvider {
        let mut history = MockHistoryProvider::new();
        history.expect_history().returning(|_, _| {
            let closes: Vec<f64> = (0..40).map(|i| 10.0 + f64::from(i)).collect();
            Ok(PriceSeries::from_closes(&closes).unwrap().points().to_vec())
        });
        history
    }

    #[test]
    fn test_interpret_rsi() {
        assert_eq!(interpret_rsi(75.0), "overbought");
        assert_eq!(interpret_rsi(25.0), "oversold");
        assert_eq!(interpret_rsi(50.0), "neutral");
    }

    #[tokio::test]
    async fn test_requested_indicators() {
        let out = tokio_test::assert_ok!(
            tool(rising_history())
                .execute(json!({
                    "symbol": "acme",
                    "range": "3mo",
                    "indicators": ["sma_3", "rsi_14", "sma_200"],
                    "include_series": true
                }))
                .await
        );

        assert_eq!(out["symbol"], "ACME");
        assert_eq!(out["range"], "3mo");
        assert_eq!(out["data_points"], 40);
        assert_eq!(out["latest"]["sma_3"], 48.0);
        assert!(out["latest"]["sma_200"].is_null());
        assert_eq!(out["rsi_signal"], "overbought");
        assert_eq!(out["series"]["sma_3"]["values"].as_array().unwrap().len(), 40);
        assert_eq!(out["trend"]["direction"], "bullish");
        assert!((out["trend"]["slope"].as_f64().unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(out["support_resistance"]["resistance"], json!([]));
    }

    #[tokio::test]
    async fn test_short_history_has_no_trend() {
        let mut history = MockHistoryProvider::new();
        history.expect_history().returning(|_, _| {
            let closes = [10.0, 11.0, 12.0];
            Ok(PriceSeries::from_closes(&closes).unwrap().points().to_vec())
        });

        let out = tokio_test::assert_ok!(
            tool(history)
                .execute(json!({"symbol": "ACME", "indicators": ["sma_2"]}))
                .await
        );
        assert_eq!(out["latest"]["sma_2"], 11.5);
        assert!(out.get("trend").is_none());
        assert!(out.get("support_resistance").is_none());
    }

    #[tokio::test]
    async fn test_unknown_indicator_is_invalid_params() {
        let err = tool(MockHistoryProvider::new())
            .execute(json!({"symbol": "ACME", "indicators": ["stochastic"]}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_unknown_range_is_invalid_params() {
        let err = tool(MockHistoryProvider::new())
            .execute(json!({"symbol": "ACME", "range": "10y"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(ref m) if m.contains("10y")));
    }

    #[test]
    fn test_tool_metadata() {
        let tool = tool(MockHistoryProvider::new());
        assert_eq!(tool.name(), "technical_indicators");
        let schema = tool.input_schema();
        assert_eq!(schema["type"], "object");
    }
}
