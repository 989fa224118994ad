//! Error types for stock data operations
//!
//! Two layers live here. [`FetchError`] is what a single fetch attempt
//! reports, tagged with a [`FailureCategory`] that decides whether the retry
//! controller tries again. [`FetchFailure`] is the single outcome surfaced to
//! callers once retrying is over. [`StockError`] covers everything else.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a fetch attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Request timed out
    Timeout,
    /// Connection refused, reset or DNS failure
    Connection,
    /// Upstream asked us to slow down (429)
    RateLimited,
    /// 5xx from upstream
    ServerError,
    /// Symbol does not resolve to a known instrument
    NotFound,
    /// Permanent 4xx other than 404
    ClientError,
    /// Symbol failed shape validation; no request was made
    MalformedSymbol,
}

impl FailureCategory {
    pub const ALL: [FailureCategory; 7] = [
        Self::Timeout,
        Self::Connection,
        Self::RateLimited,
        Self::ServerError,
        Self::NotFound,
        Self::ClientError,
        Self::MalformedSymbol,
    ];

    /// Whether another attempt could succeed
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Connection | Self::RateLimited | Self::ServerError
        )
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16) -> Self {
        match status {
            404 | 410 => Self::NotFound,
            408 => Self::Timeout,
            429 => Self::RateLimited,
            500..=599 => Self::ServerError,
            _ => Self::ClientError,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::NotFound => "not_found",
            Self::ClientError => "client_error",
            Self::MalformedSymbol => "malformed_symbol",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one fetch attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{category}: {message}")]
pub struct FetchError {
    pub category: FailureCategory,
    pub message: String,
}

impl FetchError {
    pub fn new(category: FailureCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureCategory::Timeout, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(FailureCategory::Connection, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureCategory::NotFound, message)
    }

    /// Build an error from a non-success HTTP status
    pub fn from_status(status: u16, context: &str) -> Self {
        Self::new(
            FailureCategory::from_status(status),
            format!("HTTP {status} for {context}"),
        )
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else if let Some(status) = err.status() {
            Self::new(FailureCategory::from_status(status.as_u16()), err.to_string())
        } else {
            // connect, reset, body and redirect errors are all transport-level
            Self::connection(err.to_string())
        }
    }
}

/// How a fetch call ended without a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Symbol rejected before any request
    Malformed,
    /// Upstream said the request can never succeed
    Terminal,
    /// Every allowed attempt hit a retryable error
    Exhausted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Malformed => "malformed",
            Self::Terminal => "terminal",
            Self::Exhausted => "exhausted",
        })
    }
}

/// Final failure of a fetch-and-extract call
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind} failure for {symbol} after {attempts} attempt(s) [{category}]: {message}")]
pub struct FetchFailure {
    pub symbol: String,
    pub kind: FailureKind,
    pub category: FailureCategory,
    pub attempts: u32,
    pub message: String,
}

/// Stock data specific errors
#[derive(Debug, Error)]
pub enum StockError {
    /// Symbol string failed shape validation
    #[error("Malformed symbol {input:?}: {reason}")]
    MalformedSymbol { input: String, reason: String },

    /// Fetching or extracting a quote failed
    #[error(transparent)]
    Fetch(#[from] FetchFailure),

    /// Price series violates ordering or value constraints
    #[error("Invalid price series: {0}")]
    InvalidSeries(String),

    /// Unknown indicator name
    #[error("Unknown indicator: {0}")]
    UnknownIndicator(String),

    /// History range outside the supported set
    #[error("Invalid range: {0} (expected one of 1mo, 3mo, 6mo, 1y, 2y, 5y, ytd)")]
    InvalidRange(String),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for stock operations
pub type Result<T> = std::result::Result<T, StockError>;

impl From<finscope_utils::EnvError> for StockError {
    fn from(err: finscope_utils::EnvError) -> Self {
        StockError::ConfigError(err.to_string())
    }
}

impl From<StockError> for finscope_tools::ToolError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::MalformedSymbol { .. }
            | StockError::UnknownIndicator(_)
            | StockError::InvalidRange(_) => {
                finscope_tools::ToolError::InvalidParams(err.to_string())
            }
            other => finscope_tools::ToolError::ExecutionFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StockError::MalformedSymbol {
            input: "$$".to_string(),
            reason: "bad".to_string(),
        };
        assert_eq!(err.to_string(), "Malformed symbol \"$$\": bad");

        let failure = FetchFailure {
            symbol: "AAPL".to_string(),
            kind: FailureKind::Exhausted,
            category: FailureCategory::Timeout,
            attempts: 3,
            message: "deadline".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "exhausted failure for AAPL after 3 attempt(s) [timeout]: deadline"
        );
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(FailureCategory::from_status(404), FailureCategory::NotFound);
        assert_eq!(FailureCategory::from_status(408), FailureCategory::Timeout);
        assert_eq!(FailureCategory::from_status(429), FailureCategory::RateLimited);
        assert_eq!(FailureCategory::from_status(503), FailureCategory::ServerError);
        assert_eq!(FailureCategory::from_status(403), FailureCategory::ClientError);
    }

    #[test]
    fn test_retryable_split() {
        let retryable: Vec<_> = FailureCategory::ALL
            .into_iter()
            .filter(|c| c.is_retryable())
            .collect();
        assert_eq!(
            retryable,
            vec![
                FailureCategory::Timeout,
                FailureCategory::Connection,
                FailureCategory::RateLimited,
                FailureCategory::ServerError,
            ]
        );
        assert!(!FetchError::not_found("x").is_retryable());
        assert!(FetchError::from_status(502, "AAPL").is_retryable());
    }

    #[test]
    fn test_category_index_matches_all_order() {
        for (i, c) in FailureCategory::ALL.into_iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[test]
    fn test_tool_error_conversion() {
        let err: finscope_tools::ToolError = StockError::UnknownIndicator("foo".into()).into();
        assert!(matches!(err, finscope_tools::ToolError::InvalidParams(_)));

        let err: finscope_tools::ToolError = StockError::InvalidRange("10y".into()).into();
        assert!(matches!(err, finscope_tools::ToolError::InvalidParams(_)));

        let err: finscope_tools::ToolError = StockError::InvalidSeries("x".into()).into();
        assert!(matches!(err, finscope_tools::ToolError::ExecutionFailed(_)));
    }
}
