//! Quote extraction and technical indicators
//!
//! This crate turns an uncontrolled quote web page into a typed record and a
//! daily price history into technical indicators. It includes:
//!
//! - Symbol validation before any network traffic
//! - Field extraction with ordered fallback strategies and confidence thresholds
//! - Normalization of raw strings (`$1,234.56`, `-3.2%`, `2.8T`) into typed values
//! - A retry controller with exponential backoff, jitter and an explicit state machine
//! - Lock-free health counters for monitoring
//! - SMA, EMA, MACD, RSI, Bollinger Bands, volume average, price change and volatility
//! - Tool adapters for tool-call style collaborators
//!
//! # Example
//!
//! ```rust,ignore
//! use finscope_stock::{StockConfig, StockService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = StockService::new(StockConfig::from_env()?)?;
//!
//!     let report = service.quote("AAPL").await;
//!     if let Some(record) = &report.record {
//!         println!("price: {:?}", record.number("current_price"));
//!     }
//!
//!     let indicators = service.indicators("AAPL", None, &[]).await?;
//!     println!("rsi: {:?}", indicators.latest("rsi_14"));
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod health;
pub mod indicators;
pub mod normalize;
pub mod retry;
pub mod service;
pub mod symbol;
pub mod tools;

pub use api::{HistoryProvider, HistoryRange, YahooHistoryProvider};
pub use config::{StockConfig, StockConfigBuilder};
pub use controller::{FetchReport, RetryController};
pub use error::{FailureCategory, FailureKind, FetchError, FetchFailure, Result, StockError};
pub use extract::{Extractor, FieldSpec, StockRecord, StrategyKind, first_acceptable};
pub use fetch::{HttpPageFetcher, PageFetcher};
pub use health::{HealthCounters, HealthSnapshot, HealthStatus};
pub use indicators::{
    IndicatorRequest, IndicatorSet, IndicatorSeries, PatternAnalysis, PricePoint, PriceSeries,
    SupportResistance, TechnicalAnalysis, Trend, TrendDirection, analyze, analyze_patterns,
    compute,
};
pub use normalize::{FieldValue, ValueKind, normalize};
pub use retry::{RetryEvent, RetryPolicy, RetryState};
pub use service::StockService;
pub use symbol::Symbol;
pub use tools::{HealthTool, QuoteTool, TechnicalIndicatorTool};
