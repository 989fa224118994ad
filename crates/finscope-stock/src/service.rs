//! High-level entry point tying fetching, extraction and indicators together

use futures::future::join_all;
use std::sync::Arc;
use tracing::info;

use crate::api::{HistoryProvider, HistoryRange, YahooHistoryProvider};
use crate::config::StockConfig;
use crate::controller::{FetchReport, RetryController};
use crate::error::Result;
use crate::extract::Extractor;
use crate::fetch::{HttpPageFetcher, PageFetcher};
use crate::health::{HealthCounters, HealthSnapshot};
use crate::indicators::{
    IndicatorRequest, IndicatorSet, PriceSeries, TechnicalAnalysis, analyze, compute,
};
use crate::symbol::Symbol;

/// Quote and indicator service shared by the tools and the CLI
#[derive(Clone)]
pub struct StockService {
    controller: RetryController,
    history: Arc<dyn HistoryProvider>,
    config: Arc<StockConfig>,
}

impl StockService {
    /// Production wiring: HTTP fetcher, Yahoo history, process-wide health counters
    pub fn new(config: StockConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = Arc::new(HttpPageFetcher::new(&config)?);
        let history = Arc::new(YahooHistoryProvider::new()?);
        Ok(Self::with_parts(config, fetcher, history, HealthCounters::global()))
    }

    pub fn with_parts(
        config: StockConfig,
        fetcher: Arc<dyn PageFetcher>,
        history: Arc<dyn HistoryProvider>,
        health: Arc<HealthCounters>,
    ) -> Self {
        let extractor = Extractor::default().with_min_confidence(config.min_confidence);
        let controller =
            RetryController::new(fetcher, extractor, config.retry.clone()).with_health(health);
        Self {
            controller,
            history,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &StockConfig {
        &self.config
    }

    /// Fetch and extract one quote
    pub async fn quote(&self, symbol: &str) -> FetchReport {
        self.controller.fetch_report(symbol).await
    }

    /// Fetch several quotes concurrently, reports in input order
    pub async fn quotes<S: AsRef<str>>(&self, symbols: &[S]) -> Vec<FetchReport> {
        join_all(symbols.iter().map(|s| self.quote(s.as_ref()))).await
    }

    /// Validated daily series for `symbol`
    pub async fn price_series(&self, symbol: &str, range: HistoryRange) -> Result<PriceSeries> {
        let symbol = Symbol::parse(symbol)?;
        let points = self.history.history(&symbol, range).await?;
        PriceSeries::new(points)
    }

    /// Compute indicators over the symbol's history; an empty request means the defaults
    pub async fn indicators(
        &self,
        symbol: &str,
        range: Option<HistoryRange>,
        requested: &[IndicatorRequest],
    ) -> Result<IndicatorSet> {
        let range = range.unwrap_or(self.config.history_range);
        let series = self.price_series(symbol, range).await?;
        let set = compute(&series, &with_defaults(requested));
        info!(
            symbol,
            range = %range,
            points = set.points,
            indicators = set.indicators.len(),
            "Computed indicators"
        );
        Ok(set)
    }

    /// Indicators as in [`StockService::indicators`] plus trend and support/resistance
    pub async fn analysis(
        &self,
        symbol: &str,
        range: Option<HistoryRange>,
        requested: &[IndicatorRequest],
    ) -> Result<TechnicalAnalysis> {
        let range = range.unwrap_or(self.config.history_range);
        let series = self.price_series(symbol, range).await?;
        let analysis = analyze(&series, &with_defaults(requested));
        info!(
            symbol,
            range = %range,
            points = analysis.indicators.points,
            trend = ?analysis.patterns.as_ref().map(|p| p.trend.direction),
            "Analysed history"
        );
        Ok(analysis)
    }

    pub fn health(&self) -> HealthSnapshot {
        self.controller.health().snapshot()
    }
}

fn with_defaults(requested: &[IndicatorRequest]) -> Vec<IndicatorRequest> {
    if requested.is_empty() {
        IndicatorRequest::defaults()
    } else {
        requested.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockHistoryProvider;
    use crate::error::{FetchError, StockError};
    use crate::fetch::MockPageFetcher;
    use crate::indicators::TrendDirection;
    use crate::retry::RetryPolicy;

    fn service(fetcher: MockPageFetcher, history: MockHistoryProvider) -> StockService {
        let config = StockConfig::builder().retry(RetryPolicy::fast()).build().unwrap();
        StockService::with_parts(
            config,
            Arc::new(fetcher),
            Arc::new(history),
            Arc::new(HealthCounters::new()),
        )
    }

    const GOOD_PAGE: &str =
        r#"<fin-streamer data-symbol="GOOD" data-field="regularMarketPrice">10.00</fin-streamer>"#;

    fn bars(n: usize) -> Vec<crate::indicators::PricePoint> {
        let closes: Vec<f64> = (0..n).map(|i| 50.0 + i as f64).collect();
        PriceSeries::from_closes(&closes).unwrap().points().to_vec()
    }

    #[tokio::test]
    async fn test_quotes_keep_input_order() {
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().returning(|symbol| {
            if symbol.as_str() == "GOOD" {
                Ok(GOOD_PAGE.to_string())
            } else {
                Err(FetchError::not_found("unknown"))
            }
        });
        let service = service(fetcher, MockHistoryProvider::new());

        let reports = service.quotes(&["GOOD", "BAD", "??"]).await;
        assert_eq!(reports.len(), 3);
        assert!(reports[0].success);
        assert!(!reports[1].success);
        assert_eq!(reports[1].attempts, 1);
        assert_eq!(reports[2].attempts, 0);

        let health = service.health();
        assert_eq!(health.attempts, 2);
        assert_eq!(health.successes, 1);
    }

    #[tokio::test]
    async fn test_indicators_default_set() {
        let mut history = MockHistoryProvider::new();
        history
            .expect_history()
            .withf(|symbol, range| {
                symbol.as_str() == "ACME" && *range == HistoryRange::SixMonths
            })
            .times(1)
            .returning(|_, _| Ok(bars(60)));
        let service = service(MockPageFetcher::new(), history);

        let set = service.indicators("acme", None, &[]).await.unwrap();
        assert_eq!(set.points, 60);
        assert_eq!(set.indicators.len(), IndicatorRequest::defaults().len());
        assert_eq!(set.latest("sma_20"), Some(99.5));
        assert_eq!(set.latest("sma_200"), None);
        assert_eq!(set.latest("rsi_14"), Some(100.0));
    }

    #[tokio::test]
    async fn test_analysis_reports_trend() {
        let mut history = MockHistoryProvider::new();
        history.expect_history().times(1).returning(|_, _| Ok(bars(30)));
        let service = service(MockPageFetcher::new(), history);

        let analysis = service
            .analysis("ACME", Some(HistoryRange::OneMonth), &[IndicatorRequest::Sma(5)])
            .await
            .unwrap();
        assert_eq!(analysis.indicators.latest("sma_5"), Some(77.0));
        let patterns = analysis.patterns.unwrap();
        assert_eq!(patterns.trend.direction, TrendDirection::Bullish);
        assert!((patterns.trend.slope - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_indicators_reject_bad_series() {
        let mut history = MockHistoryProvider::new();
        history.expect_history().returning(|_, _| {
            let mut points = bars(3);
            points.reverse();
            Ok(points)
        });
        let service = service(MockPageFetcher::new(), history);

        let err = service
            .indicators("ACME", Some(HistoryRange::OneMonth), &[IndicatorRequest::Sma(2)])
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::InvalidSeries(_)));
    }

    #[tokio::test]
    async fn test_indicators_malformed_symbol() {
        let mut history = MockHistoryProvider::new();
        history.expect_history().times(0);
        let service = service(MockPageFetcher::new(), history);

        let err = service.indicators("bad symbol", None, &[]).await.unwrap_err();
        assert!(matches!(err, StockError::MalformedSymbol { .. }));
    }
}
