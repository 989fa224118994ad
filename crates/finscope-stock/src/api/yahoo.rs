//! Yahoo Finance history client

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use time::OffsetDateTime;
use tracing::debug;
use yahoo_finance_api as yahoo;

use super::{HistoryProvider, HistoryRange};
use crate::error::{Result, StockError};
use crate::indicators::PricePoint;
use crate::symbol::Symbol;

/// Daily bars from Yahoo Finance
pub struct YahooHistoryProvider {
    connector: yahoo::YahooConnector,
}

impl YahooHistoryProvider {
    pub fn new() -> Result<Self> {
        let connector =
            yahoo::YahooConnector::new().map_err(|e| StockError::YahooFinanceError(e.to_string()))?;
        Ok(Self { connector })
    }
}

/// Start of the window ending at `end`
pub(crate) fn range_start(range: HistoryRange, end: DateTime<Utc>) -> DateTime<Utc> {
    match range {
        HistoryRange::OneMonth => end - Duration::days(30),
        HistoryRange::ThreeMonths => end - Duration::days(90),
        HistoryRange::SixMonths => end - Duration::days(180),
        HistoryRange::OneYear => end - Duration::days(365),
        HistoryRange::TwoYears => end - Duration::days(730),
        HistoryRange::FiveYears => end - Duration::days(1825),
        HistoryRange::YearToDate => NaiveDate::from_ymd_opt(end.year(), 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or(end - Duration::days(365), |d| d.and_utc()),
    }
}

fn to_offset(ts: DateTime<Utc>) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(ts.timestamp())
        .map_err(|e| StockError::YahooFinanceError(format!("Invalid timestamp: {e}")))
}

/// Drop unusable bars and order the rest by time, one bar per timestamp
pub(crate) fn clean_bars(mut points: Vec<PricePoint>) -> Vec<PricePoint> {
    points.retain(|p| p.close.is_finite() && p.close > 0.0);
    points.sort_by_key(|p| p.timestamp);
    points.dedup_by_key(|p| p.timestamp);
    points
}

#[async_trait]
impl HistoryProvider for YahooHistoryProvider {
    async fn history(&self, symbol: &Symbol, range: HistoryRange) -> Result<Vec<PricePoint>> {
        let end = Utc::now();
        let start = range_start(range, end);

        let response = self
            .connector
            .get_quote_history(symbol.as_str(), to_offset(start)?, to_offset(end)?)
            .await
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let points = quotes
            .iter()
            .filter_map(|q| {
                Some(PricePoint {
                    timestamp: DateTime::from_timestamp(q.timestamp as i64, 0)?,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    volume: q.volume,
                })
            })
            .collect();

        let points = clean_bars(points);
        debug!(symbol = %symbol, range = %range, bars = points.len(), "Fetched price history");
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: i64, close: f64) -> PricePoint {
        PricePoint {
            timestamp: DateTime::UNIX_EPOCH + Duration::days(day),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100,
        }
    }

    #[test]
    fn test_clean_bars_sorts_and_filters() {
        let cleaned = clean_bars(vec![
            bar(2, 12.0),
            bar(0, 10.0),
            bar(1, f64::NAN),
            bar(2, 12.5),
            bar(3, 0.0),
        ]);
        let closes: Vec<f64> = cleaned.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![10.0, 12.0]);
    }

    #[test]
    fn test_range_start() {
        let end = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(range_start(HistoryRange::OneMonth, end), end - Duration::days(30));
        assert_eq!(
            range_start(HistoryRange::YearToDate, end),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap().and_utc()
        );
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_history_live() {
        let provider = YahooHistoryProvider::new().unwrap();
        let bars = provider
            .history(&Symbol::parse("AAPL").unwrap(), HistoryRange::OneMonth)
            .await
            .unwrap();
        assert!(!bars.is_empty());
    }
}
