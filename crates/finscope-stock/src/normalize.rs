//! Cleaning of raw extracted strings into typed values
//!
//! [`normalize`] never fails loudly: anything unparseable, placeholder-like or
//! outside the sanity bounds of its [`ValueKind`] comes back as `None`, so one
//! bad field cannot abort extraction of the rest of a record.

use serde::{Deserialize, Serialize};
use std::fmt;

const PLACEHOLDERS: &[&str] = &[
    "n/a", "na", "-", "--", "---", "\u{2014}", "null", "none", "nan", "undefined",
];

const MAX_PRICE: f64 = 1_000_000.0;
const MAX_TEXT_LEN: usize = 200;

/// Expected type of a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Strictly positive price
    Currency,
    /// Signed price delta
    SignedCurrency,
    /// Percentage in [-100, 1000]
    Percentage,
    /// Financial ratio in [-1000, 1000]
    Ratio,
    /// Non-negative integer count (volumes)
    Count,
    /// Positive magnitude, typically with a K/M/B/T suffix (market cap)
    LargeNumber,
    /// Free text
    Text,
}

/// Normalized value of one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(u64),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(n) => Some(*n as f64),
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(n) => write!(f, "{n}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Clean `raw` and convert it to `kind`, or `None` if it is not a usable value
pub fn normalize(raw: &str, kind: ValueKind) -> Option<FieldValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_placeholder(trimmed) {
        return None;
    }

    match kind {
        ValueKind::Text => normalize_text(trimmed).map(FieldValue::Text),
        ValueKind::Count => {
            let n = parse_number(trimmed)?;
            (n >= 0.0).then(|| FieldValue::Integer(n.round() as u64))
        }
        _ => {
            let n = parse_number(trimmed)?;
            within_bounds(n, kind).then_some(FieldValue::Number(n))
        }
    }
}

fn is_placeholder(s: &str) -> bool {
    let lower = s.to_lowercase();
    PLACEHOLDERS.contains(&lower.as_str())
}

fn within_bounds(n: f64, kind: ValueKind) -> bool {
    match kind {
        ValueKind::Currency => n > 0.0 && n <= MAX_PRICE,
        ValueKind::SignedCurrency => n.abs() <= MAX_PRICE,
        ValueKind::Percentage => (-100.0..=1000.0).contains(&n),
        ValueKind::Ratio => (-1000.0..=1000.0).contains(&n),
        ValueKind::LargeNumber => n > 0.0,
        ValueKind::Count => n >= 0.0,
        ValueKind::Text => false,
    }
}

/// Parse a formatted number such as `$1,234.56`, `-3.2%`, `(1.05)` or `2.8T`
///
/// Parentheses without an explicit sign mean negative (accounting style);
/// `(+0.85%)` keeps its sign.
pub fn parse_number(raw: &str) -> Option<f64> {
    let mut s = raw.trim().replace('\u{2212}', "-");

    let mut negate = false;
    if s.len() >= 2 && s.starts_with('(') && s.ends_with(')') {
        s = s[1..s.len() - 1].trim().to_string();
        negate = !s.starts_with(['+', '-']);
    }

    for code in ["US$", "USD"] {
        s = s.replace(code, "");
    }

    let mut cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '$' | '\u{20ac}' | '\u{a3}' | '\u{a5}' | ',' | '%' | '+' | '_'))
        .filter(|c| !c.is_whitespace())
        .collect();

    let multiplier = match cleaned.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('K') => 1e3,
        Some('M') => 1e6,
        Some('B') => 1e9,
        Some('T') => 1e12,
        _ => 1.0,
    };
    if multiplier != 1.0 {
        cleaned.pop();
    }

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    let value = value * multiplier;
    Some(if negate { -value } else { value })
}

fn normalize_text(s: &str) -> Option<String> {
    // drop parenthesized segments such as the ticker in "Apple Inc. (AAPL)"
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }

    let collapsed = out.split_whitespace().collect::<Vec<_>>().join(" ");
    let len = collapsed.chars().count();
    if len == 0 || len > MAX_TEXT_LEN || !collapsed.chars().any(char::is_alphabetic) {
        return None;
    }
    Some(collapsed)
}
