//! Fetch-and-extract with bounded retries

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::error::{FailureCategory, FailureKind, FetchError, FetchFailure};
use crate::extract::{Extractor, StockRecord};
use crate::fetch::PageFetcher;
use crate::health::HealthCounters;
use crate::retry::{RetryEvent, RetryPolicy, RetryState};
use crate::symbol::Symbol;

/// Outcome of one quote request, successful or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchReport {
    pub symbol: String,
    pub success: bool,
    pub record: Option<StockRecord>,
    pub failure: Option<FetchFailure>,
    pub attempts: u32,
    pub elapsed_ms: u64,
}

/// Wraps a [`PageFetcher`] and an [`Extractor`] with retry and health accounting
#[derive(Clone)]
pub struct RetryController {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<Extractor>,
    policy: RetryPolicy,
    health: Arc<HealthCounters>,
}

impl RetryController {
    pub fn new(fetcher: Arc<dyn PageFetcher>, extractor: Extractor, policy: RetryPolicy) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(extractor),
            policy,
            health: HealthCounters::global(),
        }
    }

    /// Count attempts into `health` instead of the process-wide counters
    pub fn with_health(mut self, health: Arc<HealthCounters>) -> Self {
        self.health = health;
        self
    }

    pub fn health(&self) -> &Arc<HealthCounters> {
        &self.health
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Validate `input`, then fetch and extract until success or a final failure
    pub async fn fetch_and_extract(&self, input: &str) -> Result<StockRecord, FetchFailure> {
        self.run(input).await.map(|(record, _)| record)
    }

    /// Same as [`fetch_and_extract`](Self::fetch_and_extract), flattened into a report
    pub async fn fetch_report(&self, input: &str) -> FetchReport {
        let started = Instant::now();
        let result = self.run(input).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok((record, attempts)) => FetchReport {
                symbol: record.symbol().to_string(),
                success: true,
                record: Some(record),
                failure: None,
                attempts,
                elapsed_ms,
            },
            Err(failure) => FetchReport {
                symbol: failure.symbol.clone(),
                success: false,
                record: None,
                attempts: failure.attempts,
                failure: Some(failure),
                elapsed_ms,
            },
        }
    }

    async fn run(&self, input: &str) -> Result<(StockRecord, u32), FetchFailure> {
        let symbol = match Symbol::parse(input) {
            Ok(symbol) => symbol,
            Err(e) => {
                self.health.record_rejected();
                error!(input, error = %e, "Rejected malformed symbol");
                return Err(FetchFailure {
                    symbol: input.trim().to_string(),
                    kind: FailureKind::Malformed,
                    category: FailureCategory::MalformedSymbol,
                    attempts: 0,
                    message: e.to_string(),
                });
            }
        };

        let mut state = RetryState::Idle;
        let mut last_message = String::new();

        loop {
            state = match state {
                RetryState::Idle => state.next(RetryEvent::Start, &self.policy),
                RetryState::Attempting { attempt } => {
                    let started = Instant::now();
                    let outcome = self.attempt(&symbol).await;
                    let elapsed = started.elapsed();
                    let event = match outcome {
                        Ok(record) => {
                            self.health.record_success(elapsed);
                            RetryEvent::AttemptSucceeded(record)
                        }
                        Err(err) => {
                            self.health.record_failure(err.category, elapsed);
                            warn!(
                                symbol = %symbol,
                                attempt,
                                max_attempts = self.policy.max_attempts,
                                category = %err.category,
                                error = %err.message,
                                "Fetch attempt failed"
                            );
                            last_message = err.message;
                            RetryEvent::AttemptFailed(err.category)
                        }
                    };
                    state.next(event, &self.policy)
                }
                RetryState::RetryWait {
                    attempt,
                    delay,
                    last_error,
                } => {
                    warn!(
                        symbol = %symbol,
                        attempt,
                        category = %last_error,
                        ?delay,
                        "Retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    state.next(RetryEvent::BackoffElapsed, &self.policy)
                }
                RetryState::Succeeded { attempts, value } => {
                    info!(
                        symbol = %symbol,
                        attempts,
                        present = value.present_count(),
                        absent = value.absent_count(),
                        "Quote extracted"
                    );
                    return Ok((value, attempts));
                }
                RetryState::ExhaustedFailure { attempts, last_error } => {
                    error!(
                        symbol = %symbol,
                        attempts,
                        category = %last_error,
                        "Retries exhausted"
                    );
                    return Err(FetchFailure {
                        symbol: symbol.to_string(),
                        kind: FailureKind::Exhausted,
                        category: last_error,
                        attempts,
                        message: last_message,
                    });
                }
                RetryState::TerminalFailure { attempts, last_error } => {
                    error!(
                        symbol = %symbol,
                        attempts,
                        category = %last_error,
                        "Terminal fetch failure"
                    );
                    return Err(FetchFailure {
                        symbol: symbol.to_string(),
                        kind: FailureKind::Terminal,
                        category: last_error,
                        attempts,
                        message: last_message,
                    });
                }
            };
        }
    }

    /// One fetch plus extraction
    async fn attempt(&self, symbol: &Symbol) -> Result<StockRecord, FetchError> {
        let fetch = self.fetcher.fetch(symbol);
        let page = match self.policy.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| {
                    FetchError::timeout(format!("no response within {limit:?}"))
                })??,
            None => fetch.await?,
        };

        let record = self.extractor.extract(&page, symbol);
        if record.is_empty() {
            return Err(FetchError::not_found(format!("no quote data found for {symbol}")));
        }
        Ok(record)
    }
}
