//! Retry policy and the retry state machine
//!
//! [`RetryState`] is a pure transition function: it knows nothing about
//! sleeping or fetching. The controller drives it with [`RetryEvent`]s and
//! performs the suspension itself, so dropping the controller's future
//! leaves no timer or task behind.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::FailureCategory;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Delay after the first failed attempt
    pub base_delay: Duration,

    /// Upper bound for any single delay, jitter included
    pub max_delay: Duration,

    /// Random spread as a fraction of the delay (0.1 = +/-10%)
    pub jitter: f64,

    /// Per-attempt time limit; an attempt that exceeds it counts as a timeout
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: 0.1,
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: 0.0,
            attempt_timeout: None,
        }
    }

    /// Create a policy with fast retries (for testing)
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            jitter: 0.0,
            attempt_timeout: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Delay without jitter after the `attempt`-th failure (1-based)
    ///
    /// `base_delay * 2^(attempt - 1)`, capped at `max_delay`.
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let seconds = self.base_delay.as_secs_f64() * 2f64.powi(exponent);
        Duration::try_from_secs_f64(seconds)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Delay to wait after the `attempt`-th failure, jitter applied
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff_ceiling(attempt);
        if self.jitter <= 0.0 || ceiling.is_zero() {
            return ceiling;
        }

        let spread = self.jitter.min(1.0);
        let factor = 1.0 + rand::rng().random_range(-spread..=spread);
        Duration::try_from_secs_f64(ceiling.as_secs_f64() * factor)
            .map_or(ceiling, |d| d.min(self.max_delay))
    }

    fn attempt_limit(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum RetryEvent<T> {
    Start,
    AttemptSucceeded(T),
    AttemptFailed(FailureCategory),
    BackoffElapsed,
}

/// Where a fetch-and-extract call is in its retry life cycle
///
/// `Idle -> Attempting -> (Succeeded | RetryWait -> Attempting)` until it
/// ends in `Succeeded`, `ExhaustedFailure` or `TerminalFailure`.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryState<T> {
    Idle,
    Attempting {
        attempt: u32,
    },
    RetryWait {
        attempt: u32,
        delay: Duration,
        last_error: FailureCategory,
    },
    Succeeded {
        attempts: u32,
        value: T,
    },
    ExhaustedFailure {
        attempts: u32,
        last_error: FailureCategory,
    },
    TerminalFailure {
        attempts: u32,
        last_error: FailureCategory,
    },
}

impl<T> RetryState<T> {
    /// Apply an event. Events that make no sense in the current state leave
    /// it unchanged.
    pub fn next(self, event: RetryEvent<T>, policy: &RetryPolicy) -> Self {
        match (self, event) {
            (Self::Idle, RetryEvent::Start) => Self::Attempting { attempt: 1 },
            (Self::Attempting { attempt }, RetryEvent::AttemptSucceeded(value)) => Self::Succeeded {
                attempts: attempt,
                value,
            },
            (Self::Attempting { attempt }, RetryEvent::AttemptFailed(category)) => {
                if !category.is_retryable() {
                    Self::TerminalFailure {
                        attempts: attempt,
                        last_error: category,
                    }
                } else if attempt >= policy.attempt_limit() {
                    Self::ExhaustedFailure {
                        attempts: attempt,
                        last_error: category,
                    }
                } else {
                    Self::RetryWait {
                        attempt,
                        delay: policy.delay_for(attempt),
                        last_error: category,
                    }
                }
            }
            (Self::RetryWait { attempt, .. }, RetryEvent::BackoffElapsed) => Self::Attempting {
                attempt: attempt + 1,
            },
            (state, _) => state,
        }
    }

    /// Attempts made so far
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Idle => 0,
            Self::Attempting { attempt } => attempt.saturating_sub(1),
            Self::RetryWait { attempt, .. } => *attempt,
            Self::Succeeded { attempts, .. }
            | Self::ExhaustedFailure { attempts, .. }
            | Self::TerminalFailure { attempts, .. } => *attempts,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::ExhaustedFailure { .. } | Self::TerminalFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type State = RetryState<&'static str>;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
        assert_eq!(policy.jitter, 0.1);
    }

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_ceiling(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_ceiling(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_ceiling(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_ceiling(4), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_capped_at_max() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_ceiling(10), Duration::from_secs(60));
        assert_eq!(policy.backoff_ceiling(u32::MAX), Duration::from_secs(60));

        for attempt in 1..12 {
            assert!(policy.delay_for(attempt) <= policy.max_delay);
        }
    }

    #[test]
    fn test_jitter_stays_within_spread() {
        let policy = RetryPolicy {
            jitter: 0.5,
            ..RetryPolicy::default()
        };
        for _ in 0..200 {
            let delay = policy.delay_for(2).as_secs_f64();
            assert!((1.0..=3.0).contains(&delay), "delay {delay} outside jitter band");
        }
    }

    #[test]
    fn test_retryable_path_to_success() {
        let policy = RetryPolicy::fast();
        let state = State::Idle.next(RetryEvent::Start, &policy);
        assert_eq!(state, State::Attempting { attempt: 1 });

        let state = state.next(RetryEvent::AttemptFailed(FailureCategory::Timeout), &policy);
        assert!(matches!(
            state,
            State::RetryWait {
                attempt: 1,
                last_error: FailureCategory::Timeout,
                ..
            }
        ));

        let state = state.next(RetryEvent::BackoffElapsed, &policy);
        assert_eq!(state, State::Attempting { attempt: 2 });

        let state = state.next(RetryEvent::AttemptSucceeded("page"), &policy);
        assert_eq!(state, State::Succeeded { attempts: 2, value: "page" });
        assert!(state.is_finished());
    }

    #[test]
    fn test_terminal_error_stops_immediately() {
        let policy = RetryPolicy::default();
        let failed = RetryEvent::AttemptFailed(FailureCategory::NotFound);
        let state = State::Attempting { attempt: 1 }.next(failed, &policy);
        assert_eq!(
            state,
            State::TerminalFailure {
                attempts: 1,
                last_error: FailureCategory::NotFound
            }
        );
    }

    #[test]
    fn test_exhaustion_at_attempt_ceiling() {
        let policy = RetryPolicy::fast().with_max_attempts(2);
        let failed = RetryEvent::AttemptFailed(FailureCategory::ServerError);
        let state = State::Attempting { attempt: 2 }.next(failed, &policy);
        assert_eq!(
            state,
            State::ExhaustedFailure {
                attempts: 2,
                last_error: FailureCategory::ServerError
            }
        );
        assert_eq!(state.attempts(), 2);
    }

    #[test]
    fn test_invalid_events_are_ignored() {
        let policy = RetryPolicy::fast();
        assert_eq!(State::Idle.next(RetryEvent::BackoffElapsed, &policy), State::Idle);
        let done = State::TerminalFailure {
            attempts: 1,
            last_error: FailureCategory::ClientError,
        };
        assert_eq!(done.clone().next(RetryEvent::Start, &policy), done);
    }
}
