//! Field extraction with ordered fallback strategies
//!
//! Each [`FieldSpec`] lists strategies from most to least reliable. The
//! [`Extractor`] runs them in order and keeps the first hit whose confidence
//! clears the field's threshold and whose raw value normalizes. A field where
//! nothing qualifies is recorded as absent; extraction itself never fails.

mod fields;
mod record;
mod strategy;

#[cfg(test)]
mod fixtures;

pub use fields::default_fields;
pub use record::{ExtractionTrace, FieldEntry, StockRecord};
pub use strategy::{ExtractionAttempt, Page, Strategy, StrategyKind, StrategySpec};

use crate::normalize::{FieldValue, ValueKind, normalize};
use crate::symbol::Symbol;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Confidence threshold used when a field does not set its own
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

impl StrategyKind {
    /// Confidence a strategy of this kind is declared with by default
    pub fn default_confidence(self) -> f64 {
        match self {
            Self::Selector => 0.95,
            Self::EmbeddedJson => 0.85,
            Self::MetaTag => 0.75,
            Self::LabeledRow => 0.7,
            Self::LabelProximity => 0.6,
            Self::NumericScan => 0.5,
        }
    }
}

/// Which end of an `"a - b"` range a field takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePart {
    Low,
    High,
}

impl RangePart {
    /// Pick this end of a range; values without a separator pass through
    pub fn select(self, raw: &str) -> &str {
        match raw.split_once(" - ") {
            Some((low, _)) if self == RangePart::Low => low.trim(),
            Some((_, high)) => high.trim(),
            None => raw,
        }
    }
}

/// Declaration of one field: its type and the strategies that can find it
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: ValueKind,
    pub strategies: Vec<StrategySpec>,
    pub part: Option<RangePart>,
    pub min_confidence: Option<f64>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            strategies: Vec::new(),
            part: None,
            min_confidence: None,
        }
    }

    /// Append a strategy with an explicit confidence
    pub fn strategy(mut self, strategy: Strategy, confidence: f64) -> Self {
        self.strategies.push(StrategySpec::new(strategy, confidence));
        self
    }

    fn push(self, strategy: Strategy) -> Self {
        let confidence = strategy.kind().default_confidence();
        self.strategy(strategy, confidence)
    }

    pub fn selector(self, css: impl Into<String>) -> Self {
        self.push(Strategy::Selector { css: css.into() })
    }

    pub fn embedded_json(self, key: impl Into<String>) -> Self {
        self.push(Strategy::embedded_json(key))
    }

    pub fn meta_tag(self, name: impl Into<String>) -> Self {
        self.push(Strategy::MetaTag { name: name.into() })
    }

    /// Keywords are matched case-insensitively against the start of the row label
    pub fn labeled_row(self, keywords: &[&str]) -> Self {
        let keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
        self.push(Strategy::LabeledRow { keywords })
    }

    /// Regex over visible text; capture group 1 holds the value
    pub fn label(self, pattern: &str) -> Self {
        self.push(Strategy::LabelProximity {
            pattern: strategy::compile(pattern),
        })
    }

    pub fn numeric_scan(self, pattern: &str) -> Self {
        self.push(Strategy::NumericScan {
            pattern: strategy::compile(pattern),
        })
    }

    /// Narrow the most recently added strategy's hit with a capture regex
    pub fn capture(mut self, pattern: &str) -> Self {
        if let Some(last) = self.strategies.last_mut() {
            last.capture = strategy::compile(pattern);
            // an unusable capture must not let the unnarrowed hit through
            last.disabled = last.capture.is_none();
        }
        self
    }

    pub fn part(mut self, part: RangePart) -> Self {
        self.part = Some(part);
        self
    }

    pub fn min_confidence(mut self, threshold: f64) -> Self {
        self.min_confidence = Some(threshold.clamp(0.0, 1.0));
        self
    }

    fn finish(&self, raw: &str) -> Option<FieldValue> {
        let raw = match self.part {
            Some(part) => part.select(raw),
            None => raw,
        };
        normalize(raw, self.kind)
    }
}

/// A candidate accepted by [`first_acceptable`]
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted<T> {
    pub value: T,
    pub confidence: f64,
    /// Position of the winning candidate
    pub index: usize,
}

/// Run candidates in order until one produces a value at or above `threshold`
///
/// `run` is invoked lazily: once a candidate is accepted, the remaining
/// ones are never evaluated.
pub fn first_acceptable<S, T, F>(
    candidates: &[S],
    threshold: f64,
    mut run: F,
) -> Option<Accepted<T>>
where
    F: FnMut(&S) -> Option<(T, f64)>,
{
    candidates.iter().enumerate().find_map(|(index, candidate)| {
        let (value, confidence) = run(candidate)?;
        (confidence >= threshold).then_some(Accepted {
            value,
            confidence,
            index,
        })
    })
}

/// Applies a set of field specs to raw pages
#[derive(Debug, Clone)]
pub struct Extractor {
    specs: Vec<FieldSpec>,
    min_confidence: f64,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(default_fields())
    }
}

impl Extractor {
    pub fn new(specs: Vec<FieldSpec>) -> Self {
        Self {
            specs,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    /// Threshold for fields without their own
    pub fn with_min_confidence(mut self, threshold: f64) -> Self {
        self.min_confidence = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    /// Extract every declared field from `raw`
    pub fn extract(&self, raw: &str, symbol: &Symbol) -> StockRecord {
        let page = Page::parse(raw, symbol);
        let mut record = StockRecord::new(symbol.clone());

        for spec in &self.specs {
            let threshold = spec.min_confidence.unwrap_or(self.min_confidence);
            let mut invoked = 0;

            let accepted = first_acceptable(&spec.strategies, threshold, |candidate| {
                invoked += 1;
                let kind = candidate.kind();
                let outcome = candidate.attempt(&page);
                let logged = |outcome: &str, confidence: f64| {
                    debug!(
                        field = %spec.name,
                        strategy = %kind,
                        confidence,
                        outcome,
                        "Extraction attempt"
                    );
                };
                match outcome {
                    ExtractionAttempt::Miss if candidate.disabled => {
                        logged("disabled", candidate.confidence);
                        None
                    }
                    ExtractionAttempt::Miss => {
                        logged("miss", candidate.confidence);
                        None
                    }
                    ExtractionAttempt::Hit { confidence, .. } if confidence < threshold => {
                        logged("below_threshold", confidence);
                        None
                    }
                    ExtractionAttempt::Hit { raw, confidence } => match spec.finish(&raw) {
                        Some(value) => {
                            debug!(field = %spec.name, raw = %raw, "Accepted raw value");
                            logged("hit", confidence);
                            Some(((value, kind), confidence))
                        }
                        None => {
                            debug!(field = %spec.name, raw = %raw, "Raw value did not normalize");
                            logged("invalid", confidence);
                            None
                        }
                    },
                }
            });

            record.note_invocations(&spec.name, invoked);
            match accepted {
                Some(Accepted {
                    value: (value, source),
                    confidence,
                    index,
                }) => record.insert(
                    &spec.name,
                    FieldEntry {
                        value,
                        confidence,
                        source,
                        strategy_index: index,
                    },
                ),
                None => record.mark_absent(&spec.name),
            }
        }

        debug!(
            symbol = %symbol,
            present = record.present_count(),
            absent = record.absent_count(),
            "Extraction finished"
        );
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    #[test]
    fn test_first_acceptable_is_lazy() {
        let calls = Cell::new(0);
        let candidates = [Some(0.9), Some(0.8), Some(0.7)];
        let accepted = first_acceptable(&candidates, 0.5, |c| {
            calls.set(calls.get() + 1);
            c.map(|conf| ("v", conf))
        })
        .unwrap();

        assert_eq!(accepted.index, 0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_first_acceptable_skips_low_confidence_and_misses() {
        let candidates = [None, Some(0.3), Some(0.6), Some(0.9)];
        let accepted = first_acceptable(&candidates, 0.5, |c| c.map(|conf| (conf, conf))).unwrap();
        assert_eq!(accepted.index, 2);
        assert_eq!(accepted.confidence, 0.6);

        let none: Option<Accepted<f64>> =
            first_acceptable(&[None, Some(0.1)], 0.5, |c: &Option<f64>| c.map(|x| (x, x)));
        assert!(none.is_none());
    }

    #[test]
    fn test_range_part() {
        assert_eq!(RangePart::Low.select("10.5 - 12.25"), "10.5");
        assert_eq!(RangePart::High.select("10.5 - 12.25"), "12.25");
        assert_eq!(RangePart::High.select("12.25"), "12.25");
    }

    #[test]
    fn test_primary_wins_and_fallbacks_never_run() {
        let html = r#"<div id="p">101.5</div><p>Price: 99.00</p>"#;
        let extractor = Extractor::new(vec![
            FieldSpec::new("price", ValueKind::Currency)
                .selector("#p")
                .label(r"Price:\s*([0-9.]+)"),
        ]);
        let record = extractor.extract(html, &sym("ACME"));

        assert_eq!(record.number("price"), Some(101.5));
        assert_eq!(record.entry("price").unwrap().source, StrategyKind::Selector);
        assert_eq!(record.trace().invocations("price"), 1);
    }

    #[test]
    fn test_fallback_used_when_primary_misses() {
        let html = r#"<p>Price: 99.00</p>"#;
        let extractor = Extractor::new(vec![
            FieldSpec::new("price", ValueKind::Currency)
                .selector("#missing")
                .label(r"Price:\s*([0-9.]+)"),
        ]);
        let record = extractor.extract(html, &sym("ACME"));

        let entry = record.entry("price").unwrap();
        assert_eq!(entry.value, FieldValue::Number(99.0));
        assert_eq!(entry.source, StrategyKind::LabelProximity);
        assert_eq!(entry.confidence, 0.6);
        assert_eq!(entry.strategy_index, 1);
        assert_eq!(record.trace().invocations("price"), 2);
    }

    #[test]
    fn test_unnormalizable_hit_falls_through() {
        let html = r#"<div id="p">N/A</div><p>Price: 42.00</p>"#;
        let extractor = Extractor::new(vec![
            FieldSpec::new("price", ValueKind::Currency)
                .selector("#p")
                .label(r"Price:\s*([0-9.]+)"),
        ]);
        let record = extractor.extract(html, &sym("ACME"));
        assert_eq!(record.number("price"), Some(42.0));
    }

    #[test]
    fn test_low_confidence_hit_rejected() {
        let html = r#"<p>$12.34</p>"#;
        let extractor = Extractor::new(vec![
            FieldSpec::new("price", ValueKind::Currency)
                .numeric_scan(r"\$([0-9.]+)")
                .min_confidence(0.6),
        ]);
        let record = extractor.extract(html, &sym("ACME"));
        assert!(!record.is_present("price"));
        assert!(record.is_absent("price"));

        let lenient = Extractor::new(vec![
            FieldSpec::new("price", ValueKind::Currency).numeric_scan(r"\$([0-9.]+)"),
        ]);
        assert_eq!(lenient.extract(html, &sym("ACME")).number("price"), Some(12.34));
    }

    #[test]
    fn test_all_miss_is_absent_not_error() {
        let extractor = Extractor::default();
        let record = extractor.extract("<html><body>nothing here</body></html>", &sym("ACME"));
        assert!(record.is_empty());
        assert_eq!(record.coverage(), 0.0);
        assert_eq!(record.absent_count(), extractor.specs().len());
    }

    #[test]
    fn test_garbage_input_never_panics() {
        let extractor = Extractor::default();
        let inputs = [
            "",
            "\0\0\0",
            "<<<>>>",
            "{\"regularMarketPrice\": }",
            "<script>{\"beta\":{</script>",
        ];
        for raw in inputs {
            let _ = extractor.extract(raw, &sym("ACME"));
        }
    }

    #[test]
    fn test_invalid_capture_disables_strategy() {
        let html = r#"<div id="p">12.00</div>"#;
        let field = FieldSpec::new("price", ValueKind::Currency)
            .selector("#p")
            .capture("(")
            .label(r"Price:\s*([0-9.]+)");
        let disabled = &field.strategies[0];
        assert!(disabled.disabled);
        assert_eq!(disabled.kind(), StrategyKind::Selector);
        assert!(!field.strategies[1].disabled);

        let extractor = Extractor::new(vec![field]);
        let record = extractor.extract(html, &sym("ACME"));
        assert!(!record.is_present("price"));
        assert_eq!(record.trace().invocations("price"), 2);
    }
}
