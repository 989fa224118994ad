//! Extracted stock record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::StrategyKind;
use crate::normalize::FieldValue;
use crate::symbol::Symbol;

/// A resolved field and where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub value: FieldValue,
    pub confidence: f64,
    pub source: StrategyKind,
    pub strategy_index: usize,
}

/// How many strategies ran for each field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionTrace {
    invocations: BTreeMap<String, usize>,
}

impl ExtractionTrace {
    pub fn invocations(&self, field: &str) -> usize {
        self.invocations.get(field).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.invocations.values().sum()
    }
}

/// Fields extracted for one symbol
///
/// Every declared field is either present with an entry or listed as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    symbol: Symbol,
    fields: BTreeMap<String, FieldEntry>,
    absent: BTreeSet<String>,
    extracted_at: DateTime<Utc>,
    #[serde(skip)]
    trace: ExtractionTrace,
}

impl StockRecord {
    pub(crate) fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            fields: BTreeMap::new(),
            absent: BTreeSet::new(),
            extracted_at: Utc::now(),
            trace: ExtractionTrace::default(),
        }
    }

    pub(crate) fn insert(&mut self, name: &str, entry: FieldEntry) {
        self.absent.remove(name);
        self.fields.insert(name.to_string(), entry);
    }

    pub(crate) fn mark_absent(&mut self, name: &str) {
        self.fields.remove(name);
        self.absent.insert(name.to_string());
    }

    pub(crate) fn note_invocations(&mut self, name: &str, count: usize) {
        self.trace.invocations.insert(name.to_string(), count);
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn extracted_at(&self) -> DateTime<Utc> {
        self.extracted_at
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldEntry> {
        &self.fields
    }

    pub fn absent(&self) -> impl Iterator<Item = &str> {
        self.absent.iter().map(String::as_str)
    }

    pub fn entry(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.get(name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entry(name).map(|e| &e.value)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn is_absent(&self, name: &str) -> bool {
        self.absent.contains(name)
    }

    pub fn present_count(&self) -> usize {
        self.fields.len()
    }

    pub fn absent_count(&self) -> usize {
        self.absent.len()
    }

    /// True when no field resolved
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Share of declared fields that resolved, in [0, 1]
    pub fn coverage(&self) -> f64 {
        let total = self.fields.len() + self.absent.len();
        if total == 0 {
            0.0
        } else {
            self.fields.len() as f64 / total as f64
        }
    }

    pub fn trace(&self) -> &ExtractionTrace {
        &self.trace
    }
}
