//! Page fetching
//!
//! [`PageFetcher`] is the seam between the retry controller and the network.
//! [`HttpPageFetcher`] is the production implementation; tests substitute a
//! mock.

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::config::StockConfig;
use crate::error::{FailureCategory, FetchError, Result, StockError};
use crate::symbol::Symbol;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Markers of Yahoo's "no such quote" pages, served with HTTP 200
const NOT_FOUND_MARKERS: &[&str] = &[
    "Symbols similar to",
    "No results for",
    "Quote Lookup</title>",
];

/// Source of raw quote pages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the raw page for `symbol`
    async fn fetch(&self, symbol: &Symbol) -> std::result::Result<String, FetchError>;
}

/// Fetches quote pages over HTTP with a shared rate limit
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
    url_template: String,
    rate_limiter: SharedRateLimiter,
}

impl HttpPageFetcher {
    pub fn new(config: &StockConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        let per_minute = NonZeroU32::new(config.requests_per_minute)
            .ok_or_else(|| StockError::ConfigError("requests_per_minute must be > 0".to_string()))?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        Ok(Self {
            client,
            url_template: config.quote_url_template.clone(),
            rate_limiter,
        })
    }

    /// Quote page URL for a symbol
    pub fn url_for(&self, symbol: &Symbol) -> std::result::Result<Url, FetchError> {
        let raw = self.url_template.replace("{symbol}", symbol.as_str());
        Url::parse(&raw).map_err(|e| {
            FetchError::new(FailureCategory::ClientError, format!("Invalid quote URL {raw}: {e}"))
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, symbol: &Symbol) -> std::result::Result<String, FetchError> {
        let url = self.url_for(symbol)?;

        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        debug!(symbol = %symbol, url = %url, "Fetching quote page");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16(), symbol.as_str()));
        }

        if is_lookup_url(response.url()) {
            return Err(FetchError::not_found(format!("{symbol} redirected to symbol lookup")));
        }

        let body = response.text().await?;
        if looks_like_lookup_page(&body) {
            return Err(FetchError::not_found(format!("no quote found for {symbol}")));
        }

        Ok(body)
    }
}

fn is_lookup_url(url: &Url) -> bool {
    url.path().starts_with("/lookup")
}

fn looks_like_lookup_page(body: &str) -> bool {
    NOT_FOUND_MARKERS.iter().any(|m| body.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpPageFetcher {
        HttpPageFetcher::new(&StockConfig::default()).unwrap()
    }

    #[test]
    fn test_url_for_substitutes_symbol() {
        let url = fetcher().url_for(&Symbol::parse("brk-b").unwrap()).unwrap();
        assert_eq!(url.as_str(), "https://finance.yahoo.com/quote/BRK-B/");
    }

    #[test]
    fn test_lookup_detection() {
        let lookup = Url::parse("https://finance.yahoo.com/lookup?s=ZZZZ").unwrap();
        assert!(is_lookup_url(&lookup));
        assert!(!is_lookup_url(&Url::parse("https://finance.yahoo.com/quote/AAPL/").unwrap()));

        assert!(looks_like_lookup_page("<h2>Symbols similar to 'zzzz'</h2>"));
        assert!(!looks_like_lookup_page("<h1>Apple Inc. (AAPL)</h1>"));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fetch_live_page() {
        let page = fetcher().fetch(&Symbol::parse("AAPL").unwrap()).await;
        assert!(page.is_ok());
    }
}
