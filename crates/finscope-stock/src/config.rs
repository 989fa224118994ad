//! Configuration for quote fetching and indicator computation

use crate::api::HistoryRange;
use crate::error::{Result, StockError};
use crate::retry::RetryPolicy;
use finscope_utils::{env_duration_secs, env_or, env_parse};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ENV_PREFIX: &str = "FINSCOPE";

pub const DEFAULT_QUOTE_URL: &str = "https://finance.yahoo.com/quote/{symbol}/";
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) ",
    "Chrome/124.0 Safari/537.36"
);

/// Configuration for stock data operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockConfig {
    /// Quote page URL; `{symbol}` is replaced with the ticker
    pub quote_url_template: String,

    /// Request timeout duration
    pub request_timeout: Duration,

    /// Rate limit for page fetches
    pub requests_per_minute: u32,

    pub user_agent: String,

    /// Retry behaviour for page fetches
    pub retry: RetryPolicy,

    /// Confidence threshold for fields without their own
    pub min_confidence: f64,

    /// Default look-back window for indicators
    pub history_range: HistoryRange,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            quote_url_template: DEFAULT_QUOTE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            requests_per_minute: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
            min_confidence: 0.5,
            history_range: HistoryRange::SixMonths,
        }
    }
}

impl StockConfig {
    /// Create a new configuration builder
    pub fn builder() -> StockConfigBuilder {
        StockConfigBuilder::default()
    }

    /// Load from `FINSCOPE_*` environment variables, defaulting anything unset
    pub fn from_env() -> Result<Self> {
        Self::from_env_prefixed(ENV_PREFIX)
    }

    fn from_env_prefixed(prefix: &str) -> Result<Self> {
        let key = |name: &str| format!("{prefix}_{name}");
        let defaults = Self::default();

        let attempt_timeout = match env_parse::<f64>(&key("ATTEMPT_TIMEOUT_SECS"), 0.0)? {
            secs if secs > 0.0 => Some(env_duration_secs(
                &key("ATTEMPT_TIMEOUT_SECS"),
                Duration::ZERO,
            )?),
            _ => defaults.retry.attempt_timeout,
        };

        let config = Self {
            quote_url_template: env_or(&key("QUOTE_URL"), &defaults.quote_url_template),
            request_timeout: env_duration_secs(
                &key("REQUEST_TIMEOUT_SECS"),
                defaults.request_timeout,
            )?,
            requests_per_minute: env_parse(
                &key("REQUESTS_PER_MINUTE"),
                defaults.requests_per_minute,
            )?,
            user_agent: env_or(&key("USER_AGENT"), &defaults.user_agent),
            retry: RetryPolicy {
                max_attempts: env_parse(&key("MAX_ATTEMPTS"), defaults.retry.max_attempts)?,
                base_delay: env_duration_secs(
                    &key("RETRY_BASE_DELAY_SECS"),
                    defaults.retry.base_delay,
                )?,
                max_delay: env_duration_secs(
                    &key("RETRY_MAX_DELAY_SECS"),
                    defaults.retry.max_delay,
                )?,
                jitter: env_parse(&key("RETRY_JITTER"), defaults.retry.jitter)?,
                attempt_timeout,
            },
            min_confidence: env_parse(&key("MIN_CONFIDENCE"), defaults.min_confidence)?,
            history_range: env_parse(&key("HISTORY_RANGE"), defaults.history_range)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.quote_url_template.contains("{symbol}") {
            return Err(StockError::ConfigError(
                "quote_url_template must contain {symbol}".to_string(),
            ));
        }

        if self.requests_per_minute == 0 {
            return Err(StockError::ConfigError(
                "requests_per_minute must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(StockError::ConfigError(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.retry.base_delay > self.retry.max_delay {
            return Err(StockError::ConfigError(
                "retry base_delay must not exceed max_delay".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(StockError::ConfigError("retry jitter must be in [0, 1]".to_string()));
        }

        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(StockError::ConfigError(
                "min_confidence must be in [0, 1]".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for StockConfig
#[derive(Debug, Default)]
pub struct StockConfigBuilder {
    quote_url_template: Option<String>,
    request_timeout: Option<Duration>,
    requests_per_minute: Option<u32>,
    user_agent: Option<String>,
    retry: Option<RetryPolicy>,
    min_confidence: Option<f64>,
    history_range: Option<HistoryRange>,
}

impl StockConfigBuilder {
    pub fn quote_url_template(mut self, template: impl Into<String>) -> Self {
        self.quote_url_template = Some(template.into());
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    pub fn requests_per_minute(mut self, limit: u32) -> Self {
        self.requests_per_minute = Some(limit);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn min_confidence(mut self, threshold: f64) -> Self {
        self.min_confidence = Some(threshold);
        self
    }

    pub fn history_range(mut self, range: HistoryRange) -> Self {
        self.history_range = Some(range);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<StockConfig> {
        let defaults = StockConfig::default();

        let config = StockConfig {
            quote_url_template: self.quote_url_template.unwrap_or(defaults.quote_url_template),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            requests_per_minute: self.requests_per_minute.unwrap_or(defaults.requests_per_minute),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            retry: self.retry.unwrap_or(defaults.retry),
            min_confidence: self.min_confidence.unwrap_or(defaults.min_confidence),
            history_range: self.history_range.unwrap_or(defaults.history_range),
        };

        config.validate()?;
        Ok(config)
    }
}
