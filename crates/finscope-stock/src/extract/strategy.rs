//! Extraction strategies
//!
//! A strategy is a pure function of the page (and symbol) that either finds a
//! raw string for a field or misses. Malformed selectors, patterns and JSON
//! are misses, never panics.

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::symbol::Symbol;

/// Identity of a strategy, recorded as the source of each resolved field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Selector,
    EmbeddedJson,
    MetaTag,
    LabeledRow,
    LabelProximity,
    NumericScan,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Selector => "selector",
            Self::EmbeddedJson => "embedded_json",
            Self::MetaTag => "meta_tag",
            Self::LabeledRow => "labeled_row",
            Self::LabelProximity => "label_proximity",
            Self::NumericScan => "numeric_scan",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to locate a raw value in a page
#[derive(Debug, Clone)]
pub enum Strategy {
    /// CSS selector; `{symbol}` is replaced with the ticker
    Selector { css: String },
    /// `"key": value` inside an inline `<script>` payload
    EmbeddedJson { key: String, pattern: Option<Regex> },
    /// `content` of `<meta name=..>` or `<meta property=..>`
    MetaTag { name: String },
    /// `tr`/`li` whose first cell starts with one of the (lower-case) keywords
    LabeledRow { keywords: Vec<String> },
    /// Regex over the visible text, value in capture group 1
    LabelProximity { pattern: Option<Regex> },
    /// Broad regex over the visible text, last resort
    NumericScan { pattern: Option<Regex> },
}

/// Result of running one strategy for one field
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionAttempt {
    Hit { raw: String, confidence: f64 },
    Miss,
}

/// A strategy with its declared confidence and optional capture regex
#[derive(Debug, Clone)]
pub struct StrategySpec {
    pub strategy: Strategy,
    pub confidence: f64,
    pub capture: Option<Regex>,
    /// Set when the strategy was declared with an unusable pattern; it always misses
    pub disabled: bool,
}

/// Parsed page shared by every strategy during one extraction run
pub struct Page<'a> {
    html: Html,
    text: String,
    symbol: &'a Symbol,
}

impl<'a> Page<'a> {
    pub fn parse(raw: &str, symbol: &'a Symbol) -> Self {
        let html = Html::parse_document(raw);
        let text = visible_text(&html);
        Self { html, text, symbol }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Compile a pattern, logging and discarding it if invalid
pub(crate) fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(
                pattern,
                error = %e,
                "Invalid extraction pattern; strategy will always miss"
            );
            None
        }
    }
}

impl Strategy {
    pub fn embedded_json(key: impl Into<String>) -> Self {
        let key = key.into();
        let pattern = compile(&format!(
            r#""{}"\s*:\s*(\{{[^{{}}]*\}}|"(?:[^"\\]|\\.)*"|-?[0-9][0-9.eE+-]*)"#,
            regex::escape(&key)
        ));
        Strategy::EmbeddedJson { key, pattern }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Selector { .. } => StrategyKind::Selector,
            Strategy::EmbeddedJson { .. } => StrategyKind::EmbeddedJson,
            Strategy::MetaTag { .. } => StrategyKind::MetaTag,
            Strategy::LabeledRow { .. } => StrategyKind::LabeledRow,
            Strategy::LabelProximity { .. } => StrategyKind::LabelProximity,
            Strategy::NumericScan { .. } => StrategyKind::NumericScan,
        }
    }

    /// Find the raw string this strategy points at
    pub fn locate(&self, page: &Page<'_>) -> Option<String> {
        match self {
            Strategy::Selector { css } => {
                let css = css.replace("{symbol}", page.symbol.as_str());
                let selector = Selector::parse(&css).ok()?;
                page.html
                    .select(&selector)
                    .map(element_text)
                    .find(|t| !t.is_empty())
            }
            Strategy::EmbeddedJson { key, pattern } => {
                let pattern = pattern.as_ref()?;
                let needle = format!("\"{key}\"");
                let scripts = Selector::parse("script").ok()?;
                let bodies: Vec<String> = page
                    .html
                    .select(&scripts)
                    .map(|s| s.text().collect::<String>())
                    .filter(|body| body.contains(&needle))
                    .collect();
                embedded_value(&bodies, pattern, page.symbol)
            }
            Strategy::MetaTag { name } => {
                let css = format!(r#"meta[name="{name}"], meta[property="{name}"]"#);
                let selector = Selector::parse(&css).ok()?;
                page.html
                    .select(&selector)
                    .filter_map(|el| el.value().attr("content"))
                    .map(str::trim)
                    .find(|c| !c.is_empty())
                    .map(str::to_string)
            }
            Strategy::LabeledRow { keywords } => {
                let rows = Selector::parse("tr, li").ok()?;
                page.html.select(&rows).find_map(|row| {
                    let cells = row_cells(row);
                    let label = cells.first()?.to_lowercase();
                    if !keywords.iter().any(|k| label.starts_with(k.as_str())) {
                        return None;
                    }
                    cells.into_iter().nth(1)
                })
            }
            Strategy::LabelProximity { pattern } | Strategy::NumericScan { pattern } => {
                let caps = pattern.as_ref()?.captures(&page.text)?;
                let m = caps.get(1).or_else(|| caps.get(0))?;
                Some(m.as_str().trim().to_string())
            }
        }
    }
}

impl StrategySpec {
    pub fn new(strategy: Strategy, confidence: f64) -> Self {
        Self {
            strategy,
            confidence: confidence.clamp(0.0, 1.0),
            capture: None,
            disabled: false,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Run the strategy against a page
    pub fn attempt(&self, page: &Page<'_>) -> ExtractionAttempt {
        if self.disabled {
            return ExtractionAttempt::Miss;
        }
        let Some(raw) = self.strategy.locate(page) else {
            return ExtractionAttempt::Miss;
        };

        let raw = match &self.capture {
            None => Some(raw),
            Some(re) => re
                .captures(&raw)
                .and_then(|c| c.get(1).or_else(|| c.get(0)))
                .map(|m| m.as_str().trim().to_string()),
        };

        match raw {
            Some(raw) if !raw.is_empty() => ExtractionAttempt::Hit {
                raw,
                confidence: self.confidence,
            },
            _ => ExtractionAttempt::Miss,
        }
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Texts of a row's cells: its non-empty child elements
///
/// A row whose only child is a wrapper (`<li><div>..</div></li>`) is read
/// through that wrapper, so nested label markup stays one cell.
fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    let mut current = row;
    loop {
        let children: Vec<(ElementRef<'_>, String)> = current
            .children()
            .filter_map(ElementRef::wrap)
            .map(|el| (el, element_text(el)))
            .filter(|(_, text)| !text.is_empty())
            .collect();
        match children.as_slice() {
            [(only, _)] => current = *only,
            _ => return children.into_iter().map(|(_, text)| text).collect(),
        }
    }
}

/// Spans of every `{...}` object in a script body, ignoring braces in strings
fn object_spans(body: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open = Vec::new();
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (i, b) in body.bytes().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, i));
                }
            }
            _ => {}
        }
    }
    spans
}

fn innermost(spans: &[(usize, usize)], pos: usize) -> Option<(usize, usize)> {
    spans
        .iter()
        .copied()
        .filter(|&(start, end)| start < pos && pos < end)
        .min_by_key(|&(start, end)| end - start)
}

fn symbol_marker() -> Option<&'static Regex> {
    static MARKER: OnceLock<Option<Regex>> = OnceLock::new();
    MARKER
        .get_or_init(|| compile(r#""symbol"\s*:\s*"([^"]+)""#))
        .as_ref()
}

/// Ticker named by the `"symbol"` member of the object enclosing `pos`
fn owner_symbol<'b>(body: &'b str, spans: &[(usize, usize)], pos: usize) -> Option<&'b str> {
    let object = innermost(spans, pos)?;
    symbol_marker()?
        .captures_iter(&body[object.0..=object.1])
        .filter_map(|caps| Some((caps.get(0)?.start(), caps.get(1)?.as_str())))
        .find(|&(start, _)| innermost(spans, object.0 + start) == Some(object))
        .map(|(_, owner)| owner)
}

/// First embedded value belonging to `symbol`
///
/// A match inside an object tagged with the page's ticker wins; one inside an
/// object tagged with another ticker is skipped; an untagged match is the
/// fallback.
fn embedded_value(bodies: &[String], pattern: &Regex, symbol: &Symbol) -> Option<String> {
    let mut untagged = None;
    for body in bodies {
        let spans = object_spans(body);
        for caps in pattern.captures_iter(body) {
            let (Some(all), Some(value)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            match owner_symbol(body, &spans, all.start()) {
                Some(owner) if owner.eq_ignore_ascii_case(symbol.as_str()) => {
                    if let Some(raw) = json_scalar(value.as_str()) {
                        return Some(raw);
                    }
                }
                Some(_) => {}
                None => {
                    if untagged.is_none() {
                        untagged = json_scalar(value.as_str());
                    }
                }
            }
        }
    }
    untagged
}

/// Visible text of the document, one space between text nodes
fn visible_text(html: &Html) -> String {
    let mut out = String::new();
    for node in html.tree.nodes() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element())
            .is_some_and(|e| {
                matches!(e.name(), "script" | "style" | "noscript" | "template" | "title")
            });
        if hidden {
            continue;
        }
        for word in text.split_whitespace() {
            out.push_str(word);
            out.push(' ');
        }
    }
    out.truncate(out.trim_end().len());
    out
}

/// Turn a matched JSON value into a raw string
///
/// Handles bare numbers, strings and Yahoo's `{"raw": .., "fmt": ..}` objects.
fn json_scalar(matched: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(matched).ok()?;
    let scalar = match &value {
        serde_json::Value::Object(map) => map.get("raw").or_else(|| map.get("fmt"))?,
        other => other,
    };
    match scalar {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}
