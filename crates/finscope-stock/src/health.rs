//! Health counters for fetch observability
//!
//! Every fetch attempt, successful or not, is counted here. Counters are plain
//! atomics so concurrent calls never contend on them; only the short window of
//! recent response times sits behind a lock, held for a push or a sum. A
//! monitoring collaborator polls [`HealthCounters::snapshot`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use crate::error::FailureCategory;

const HEALTHY_RATE: f64 = 0.95;
const DEGRADED_RATE: f64 = 0.8;

/// Number of recent attempts the average response time covers
pub const RESPONSE_WINDOW: usize = 100;

const NEVER: i64 = i64::MIN;

/// Coarse health classification derived from the success rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// No attempts recorded yet
    Idle,
    Healthy,
    Degraded,
    Unhealthy,
}

/// Cumulative fetch counters
#[derive(Debug)]
pub struct HealthCounters {
    started: Instant,
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: [AtomicU64; FailureCategory::ALL.len()],
    last_success_ms: AtomicI64,
    last_failure_ms: AtomicI64,
    response_times: Mutex<VecDeque<Duration>>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub failures: BTreeMap<FailureCategory, u64>,
    pub success_rate: f64,
    pub status: HealthStatus,
    /// Mean duration of the last [`RESPONSE_WINDOW`] attempts
    pub average_response_ms: Option<f64>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
}

impl HealthSnapshot {
    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }

    pub fn failures_for(&self, category: FailureCategory) -> u64 {
        self.failures.get(&category).copied().unwrap_or(0)
    }
}

impl Default for HealthCounters {
    fn default() -> Self {
        Self::new()
    }
}

fn stamp(cell: &AtomicI64) {
    cell.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
}

fn read_stamp(cell: &AtomicI64) -> Option<DateTime<Utc>> {
    match cell.load(Ordering::Relaxed) {
        NEVER => None,
        ms => DateTime::from_timestamp_millis(ms),
    }
}

impl HealthCounters {
    /// Create an isolated set of counters
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: std::array::from_fn(|_| AtomicU64::new(0)),
            last_success_ms: AtomicI64::new(NEVER),
            last_failure_ms: AtomicI64::new(NEVER),
            response_times: Mutex::new(VecDeque::with_capacity(RESPONSE_WINDOW)),
        }
    }

    /// Process-wide counters, created on first use and never reset
    pub fn global() -> Arc<HealthCounters> {
        static GLOBAL: OnceLock<Arc<HealthCounters>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(HealthCounters::new())))
    }

    /// Count a successful attempt that took `elapsed`
    pub fn record_success(&self, elapsed: Duration) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.successes.fetch_add(1, Ordering::Relaxed);
        stamp(&self.last_success_ms);
        self.push_response_time(elapsed);
    }

    /// Count a failed attempt that took `elapsed`
    pub fn record_failure(&self, category: FailureCategory, elapsed: Duration) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.failures[category.index()].fetch_add(1, Ordering::Relaxed);
        stamp(&self.last_failure_ms);
        self.push_response_time(elapsed);
    }

    /// Count a symbol rejected before any request was made
    ///
    /// Shows up under `malformed_symbol` without adding an attempt.
    pub fn record_rejected(&self) {
        self.failures[FailureCategory::MalformedSymbol.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    fn push_response_time(&self, elapsed: Duration) {
        let mut window = self
            .response_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if window.len() == RESPONSE_WINDOW {
            window.pop_front();
        }
        window.push_back(elapsed);
    }

    fn average_response_ms(&self) -> Option<f64> {
        let window = self
            .response_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if window.is_empty() {
            return None;
        }
        let total: f64 = window.iter().map(|d| d.as_secs_f64() * 1000.0).sum();
        Some(total / window.len() as f64)
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        // successes <= attempts, whatever lands between the two loads
        let successes = self.successes.load(Ordering::Relaxed);
        let attempts = self.attempts.load(Ordering::Relaxed);
        let successes = successes.min(attempts);
        let failures = FailureCategory::ALL
            .into_iter()
            .map(|c| (c, self.failures[c.index()].load(Ordering::Relaxed)))
            .collect();

        let success_rate = if attempts == 0 {
            0.0
        } else {
            successes as f64 / attempts as f64
        };

        let status = if attempts == 0 {
            HealthStatus::Idle
        } else if success_rate >= HEALTHY_RATE {
            HealthStatus::Healthy
        } else if success_rate >= DEGRADED_RATE {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        HealthSnapshot {
            attempts,
            successes,
            failures,
            success_rate,
            status,
            average_response_ms: self.average_response_ms(),
            last_success: read_stamp(&self.last_success_ms),
            last_failure: read_stamp(&self.last_failure_ms),
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }
}
