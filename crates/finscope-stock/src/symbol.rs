//! Ticker symbol validation

use crate::error::{Result, StockError};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_SYMBOL_LEN: usize = 10;

/// Normalized, upper-case ticker symbol
///
/// Accepts 1 to 10 characters starting with a letter, followed by letters,
/// digits, `.` or `-` (exchange variants such as `BRK-B` or `RY.TO`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a symbol
    pub fn parse(input: &str) -> Result<Self> {
        let malformed = |reason: String| StockError::MalformedSymbol {
            input: input.to_string(),
            reason,
        };

        let normalized = input.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(malformed("symbol is empty".to_string()));
        }

        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(malformed(format!(
                "{len} characters exceeds the maximum of {MAX_SYMBOL_LEN}"
            )));
        }

        let mut chars = normalized.chars();
        if let Some(first) = chars.next() {
            if !first.is_ascii_alphabetic() {
                return Err(malformed(format!("must start with a letter, found {first:?}")));
            }
        }

        if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '-')) {
            return Err(malformed(format!("invalid character {bad:?}")));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Symbol {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = StockError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
