//! Environment-backed configuration helpers
//!
//! Configuration structs in the workspace read their overrides through these
//! helpers so that unset variables fall back to defaults and malformed ones
//! surface as a typed error instead of being silently ignored.

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Error raised when an environment variable is present but unparseable
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value {value:?} for {key}: {reason}")]
pub struct EnvError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

fn lookup(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a string variable, returning `default` when unset or blank
pub fn env_or(key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Parse a variable into `T`, returning `default` when unset
pub fn env_parse<T>(key: &str, default: T) -> Result<T, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| EnvError {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

/// Parse a variable holding fractional seconds into a `Duration`
pub fn env_duration_secs(key: &str, default: Duration) -> Result<Duration, EnvError> {
    let secs = env_parse::<f64>(key, default.as_secs_f64())?;
    Duration::try_from_secs_f64(secs).map_err(|e| EnvError {
        key: key.to_string(),
        value: secs.to_string(),
        reason: e.to_string(),
    })
}
