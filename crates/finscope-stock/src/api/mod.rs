//! Historical price data providers

pub mod yahoo;

pub use yahoo::YahooHistoryProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StockError};
use crate::indicators::PricePoint;
use crate::symbol::Symbol;

/// Look-back window for historical bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HistoryRange {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    YearToDate,
}

impl HistoryRange {
    pub const ALL: [HistoryRange; 7] = [
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::TwoYears,
        Self::FiveYears,
        Self::YearToDate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::YearToDate => "ytd",
        }
    }
}

impl fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryRange {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| StockError::InvalidRange(s.to_string()))
    }
}

impl TryFrom<String> for HistoryRange {
    type Error = StockError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<HistoryRange> for String {
    fn from(range: HistoryRange) -> Self {
        range.as_str().to_string()
    }
}

/// Source of daily price bars
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Daily bars for `symbol`, oldest first
    async fn history(&self, symbol: &Symbol, range: HistoryRange) -> Result<Vec<PricePoint>>;
}
