//! Table rendering for terminal output

use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table, presets};
use finscope_stock::{FetchReport, HealthSnapshot, IndicatorSet, PatternAnalysis, StockRecord};

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn number(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

/// One row per declared field, absent ones included
pub fn record_table(record: &StockRecord, field_order: &[String]) -> Table {
    let mut table = table(vec!["Field", "Value", "Source", "Confidence"]);
    for name in field_order {
        match record.entry(name) {
            Some(entry) => table.add_row(vec![
                name.clone(),
                entry.value.to_string(),
                entry.source.to_string(),
                format!("{:.2}", entry.confidence),
            ]),
            None => table.add_row(vec![
                name.clone(),
                "n/a".to_string(),
                String::new(),
                String::new(),
            ]),
        };
    }
    table
}

/// One line per report with outcome, attempts and coverage
pub fn summary_table(reports: &[FetchReport]) -> Table {
    let mut table = table(vec!["Symbol", "Outcome", "Attempts", "Fields", "Elapsed (ms)"]);
    for report in reports {
        let outcome = match &report.failure {
            Some(failure) => format!(
                "{} ({}): {}",
                failure.kind, failure.category, failure.message
            ),
            None => "ok".to_string(),
        };
        let fields = report.record.as_ref().map_or_else(String::new, |r| {
            format!("{}/{}", r.present_count(), r.present_count() + r.absent_count())
        });
        table.add_row(vec![
            report.symbol.clone(),
            outcome,
            report.attempts.to_string(),
            fields,
            report.elapsed_ms.to_string(),
        ]);
    }
    table
}

pub fn health_table(health: &HealthSnapshot) -> Table {
    let mut table = table(vec!["Counter", "Value"]);
    let status = format!("{:?}", health.status).to_lowercase();
    let rate = format!("{:.1}%", health.success_rate * 100.0);
    let average = health
        .average_response_ms
        .map_or_else(|| "n/a".to_string(), |ms| format!("{ms:.1}"));
    let when = |t: Option<DateTime<Utc>>| {
        t.map_or_else(|| "never".to_string(), |t| t.to_rfc3339())
    };

    table.add_row(vec!["status".to_string(), status]);
    table.add_row(vec!["attempts".to_string(), health.attempts.to_string()]);
    table.add_row(vec!["successes".to_string(), health.successes.to_string()]);
    table.add_row(vec!["success_rate".to_string(), rate]);
    for (category, count) in &health.failures {
        table.add_row(vec![format!("failures.{category}"), count.to_string()]);
    }
    table.add_row(vec!["average_response_ms".to_string(), average]);
    table.add_row(vec!["last_success".to_string(), when(health.last_success)]);
    table.add_row(vec!["last_failure".to_string(), when(health.last_failure)]);
    table.add_row(vec!["uptime_secs".to_string(), health.uptime_secs.to_string()]);
    table
}

/// Latest value of every indicator component
pub fn indicator_table(set: &IndicatorSet) -> Table {
    let mut table = table(vec!["Indicator", "Latest"]);
    for (name, value) in set.latest_values() {
        table.add_row(vec![name, number(value)]);
    }
    table
}

fn levels(values: &[f64]) -> String {
    if values.is_empty() {
        return "none".to_string();
    }
    values
        .iter()
        .map(|v| format!("{v:.2}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Trend direction, strength and slope, then the price levels
pub fn pattern_table(patterns: &PatternAnalysis) -> Table {
    let mut table = table(vec!["Pattern", "Value"]);
    let trend = &patterns.trend;
    let direction = format!("{:?}", trend.direction).to_lowercase();
    let sr = &patterns.support_resistance;

    table.add_row(vec!["trend".to_string(), direction]);
    table.add_row(vec!["strength".to_string(), format!("{:.2}", trend.strength)]);
    table.add_row(vec!["slope".to_string(), format!("{:.4}", trend.slope)]);
    table.add_row(vec!["resistance".to_string(), levels(&sr.resistance)]);
    table.add_row(vec!["support".to_string(), levels(&sr.support)]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use finscope_stock::{
        Extractor, FailureCategory, FailureKind, FetchFailure, HealthCounters, IndicatorRequest,
        PriceSeries, Symbol, analyze_patterns, compute,
    };
    use std::time::Duration;

    const PAGE: &str = r#"<html><body>
        <h1>Apple Inc. (AAPL)</h1>
        <fin-streamer data-symbol="AAPL" data-field="regularMarketPrice">189.50</fin-streamer>
    </body></html>"#;

    fn record() -> StockRecord {
        let symbol = Symbol::parse("AAPL").unwrap();
        Extractor::default().extract(PAGE, &symbol)
    }

    fn field_order() -> Vec<String> {
        Extractor::default().specs().iter().map(|s| s.name.clone()).collect()
    }

    #[test]
    fn test_record_table_lists_present_and_absent_fields() {
        let rendered = record_table(&record(), &field_order()).to_string();
        assert!(rendered.contains("current_price"));
        assert!(rendered.contains("189.5"));
        assert!(rendered.contains("selector"));
        assert!(rendered.contains("market_cap"));
        assert!(rendered.contains("n/a"));
    }

    #[test]
    fn test_summary_table_shows_failure_kind() {
        let ok = FetchReport {
            symbol: "AAPL".to_string(),
            success: true,
            record: Some(record()),
            failure: None,
            attempts: 1,
            elapsed_ms: 12,
        };
        let failed = FetchReport {
            symbol: "ZZZZ".to_string(),
            success: false,
            record: None,
            failure: Some(FetchFailure {
                symbol: "ZZZZ".to_string(),
                kind: FailureKind::Terminal,
                category: FailureCategory::NotFound,
                attempts: 1,
                message: "no quote".to_string(),
            }),
            attempts: 1,
            elapsed_ms: 3,
        };

        let rendered = summary_table(&[ok, failed]).to_string();
        assert!(rendered.contains("AAPL"));
        assert!(rendered.contains("ok"));
        assert!(rendered.contains("terminal"));
        assert!(rendered.contains("no quote"));
    }

    #[test]
    fn test_health_table_includes_every_category() {
        let counters = HealthCounters::new();
        counters.record_success(Duration::from_millis(20));
        counters.record_failure(FailureCategory::Timeout, Duration::from_millis(40));
        let rendered = health_table(&counters.snapshot()).to_string();

        assert!(rendered.contains("50.0%"));
        assert!(rendered.contains("30.0"));
        assert!(!rendered.contains("never"));
        for category in FailureCategory::ALL {
            assert!(rendered.contains(&format!("failures.{category}")));
        }
    }

    #[test]
    fn test_indicator_table_marks_undefined_values() {
        let closes: Vec<f64> = (1..=10).map(f64::from).collect();
        let series = PriceSeries::from_closes(&closes).unwrap();
        let set = compute(&series, &[IndicatorRequest::Sma(5), IndicatorRequest::Sma(50)]);

        let rendered = indicator_table(&set).to_string();
        assert!(rendered.contains("sma_5"));
        assert!(rendered.contains("8.0000"));
        assert!(rendered.contains("n/a"));
    }

    #[test]
    fn test_pattern_table_lists_trend_and_levels() {
        let closes = [10.0, 12.0, 11.0, 13.0, 12.0, 14.0, 13.0, 15.0, 14.0, 16.0, 15.0, 17.0];
        let series = PriceSeries::from_closes(&closes).unwrap();
        let patterns = analyze_patterns(&series).unwrap();

        let rendered = pattern_table(&patterns).to_string();
        assert!(rendered.contains("bullish"));
        assert!(rendered.contains("16.00, 15.00, 14.00, 13.00, 12.00"));
        assert!(rendered.contains("11.00, 12.00, 13.00, 14.00, 15.00"));
    }
}
