//! Recorded page shapes run through the default catalog

use super::*;

const FULL_QUOTE: &str = r#"<!DOCTYPE html>
<html><head>
  <title>Apple Inc. (AAPL) Stock Price</title>
  <meta property="og:title" content="Apple Inc. (AAPL) Stock Price, News, Quote">
</head><body>
  <h1>Apple Inc. (AAPL)</h1>
  <fin-streamer data-symbol="AAPL" data-field="regularMarketPrice">227.52</fin-streamer>
  <fin-streamer data-symbol="AAPL" data-field="regularMarketChange">-1.48</fin-streamer>
  <fin-streamer data-symbol="AAPL" data-field="regularMarketChangePercent">(-0.65%)</fin-streamer>
  <fin-streamer data-symbol="AAPL" data-field="regularMarketPreviousClose">229.00</fin-streamer>
  <fin-streamer data-symbol="AAPL" data-field="regularMarketOpen">228.10</fin-streamer>
  <fin-streamer data-symbol="AAPL" data-field="regularMarketDayRange">226.05 - 229.40</fin-streamer>
  <fin-streamer data-symbol="AAPL" data-field="fiftyTwoWeekRange">164.08 - 237.23</fin-streamer>
  <fin-streamer data-symbol="AAPL" data-field="regularMarketVolume">42,152,310</fin-streamer>
  <fin-streamer data-symbol="AAPL" data-field="marketCap">3.459T</fin-streamer>
  <ul>
    <li><span>Avg. Volume</span><span>53,214,009</span></li>
    <li><span>PE Ratio (TTM)</span><span>34.63</span></li>
    <li><span>EPS (TTM)</span><span>6.57</span></li>
    <li><span>Beta (5Y Monthly)</span><span>1.24</span></li>
    <li><span>Forward Dividend &amp; Yield</span><span>1.00 (0.44%)</span></li>
  </ul>
</body></html>"#;

const FALLBACK_QUOTE: &str = r#"<html><head>
  <meta property="og:title" content="Acme Corp (ACME) Stock Price">
  <script>root.App.main = {"quote":{
    "regularMarketPrice":{"raw":12.5,"fmt":"12.50"},
    "regularMarketChange":{"raw":-0.25,"fmt":"-0.25"}}};</script>
</head><body>
  <table>
    <tr><td>Previous Close</td><td>12.75</td></tr>
    <tr><td>Day's Range</td><td>12.10 - 12.90</td></tr>
    <tr><td>Volume</td><td>N/A</td></tr>
  </table>
</body></html>"#;

const NESTED_TABLE_QUOTE: &str = r#"<html><body>
  <h1>Acme Corp (ACME)</h1>
  <table>
    <tr><td><span>Previous Close</span></td><td><span>12.75</span></td></tr>
    <tr><td><span>Volume</span></td><td><span>1,204,311</span></td></tr>
    <tr><td><span>Avg. Volume</span></td><td><span>980,020</span></td></tr>
    <tr><td><span>PE Ratio (TTM)</span></td><td><span>18.20</span></td></tr>
    <tr><td><span>EPS (TTM)</span></td><td><span>0.69</span></td></tr>
    <tr><td><span>Beta (5Y Monthly)</span></td><td><span>1.08</span></td></tr>
    <tr><td><span>Forward Dividend &amp; Yield</span></td><td><span>0.40 (3.20%)</span></td></tr>
  </table>
</body></html>"#;

const RELATED_TICKERS_QUOTE: &str = r#"<html><head>
  <script>root.App.main = {"related":[{"symbol":"MSFT","regularMarketPrice":{"raw":410.2}}],
    "price":{"regularMarketPrice":{"raw":12.5,"fmt":"12.50"},"symbol":"ACME"}};</script>
</head><body></body></html>"#;

fn extract(raw: &str, symbol: &str) -> StockRecord {
    Extractor::default().extract(raw, &Symbol::parse(symbol).unwrap())
}

#[test]
fn test_full_page_resolves_every_field() {
    let record = extract(FULL_QUOTE, "AAPL");

    let absent: Vec<_> = record.absent().collect();
    assert!(absent.is_empty(), "absent: {absent:?}");
    assert_eq!(record.coverage(), 1.0);
    assert_eq!(record.text("company_name"), Some("Apple Inc."));
    assert_eq!(record.number("current_price"), Some(227.52));
    assert_eq!(record.number("price_change"), Some(-1.48));
    assert_eq!(record.number("price_change_percent"), Some(-0.65));
    assert_eq!(record.number("day_low"), Some(226.05));
    assert_eq!(record.number("day_high"), Some(229.40));
    assert_eq!(record.number("week_52_low"), Some(164.08));
    assert_eq!(record.number("week_52_high"), Some(237.23));
    assert_eq!(record.get("volume"), Some(&FieldValue::Integer(42_152_310)));
    assert_eq!(record.get("avg_volume"), Some(&FieldValue::Integer(53_214_009)));
    assert_eq!(record.number("pe_ratio"), Some(34.63));
    assert_eq!(record.number("dividend_yield"), Some(0.44));

    let cap = record.number("market_cap").unwrap();
    assert!((cap - 3.459e12).abs() < 1.0);

    let price = record.entry("current_price").unwrap();
    assert_eq!(price.source, StrategyKind::Selector);
    assert_eq!(price.confidence, 0.95);
    assert_eq!(record.trace().invocations("current_price"), 1);
}

#[test]
fn test_fallback_page_uses_secondary_strategies() {
    let record = extract(FALLBACK_QUOTE, "ACME");

    let name = record.entry("company_name").unwrap();
    assert_eq!(name.value, FieldValue::Text("Acme Corp".into()));
    assert_eq!(name.source, StrategyKind::MetaTag);

    let price = record.entry("current_price").unwrap();
    assert_eq!(price.value, FieldValue::Number(12.5));
    assert_eq!(price.source, StrategyKind::EmbeddedJson);
    assert_eq!(price.confidence, 0.85);

    assert_eq!(record.number("price_change"), Some(-0.25));
    assert_eq!(record.entry("previous_close").unwrap().source, StrategyKind::LabeledRow);
    assert_eq!(record.number("previous_close"), Some(12.75));
    assert_eq!(record.number("day_low"), Some(12.10));
    assert_eq!(record.number("day_high"), Some(12.90));

    assert!(record.is_absent("volume"));
    assert!(record.is_absent("market_cap"));
    assert!(record.coverage() > 0.0 && record.coverage() < 1.0);
}

#[test]
fn test_numeric_scan_is_last_resort() {
    let record = extract("<html><body><p>Trading at $1,234.56 now</p></body></html>", "ACME");
    let price = record.entry("current_price").unwrap();
    assert_eq!(price.value, FieldValue::Number(1234.56));
    assert_eq!(price.source, StrategyKind::NumericScan);
    assert_eq!(record.trace().invocations("current_price"), 6);
}

#[test]
fn test_selector_for_other_symbol_does_not_match() {
    let record = extract(FULL_QUOTE, "MSFT");
    assert_ne!(
        record.entry("current_price").map(|e| e.source),
        Some(StrategyKind::Selector)
    );
}

#[test]
fn test_nested_cell_markup_resolves_row_values() {
    let record = extract(NESTED_TABLE_QUOTE, "ACME");

    for field in ["previous_close", "volume", "avg_volume", "pe_ratio", "eps", "beta"] {
        let entry = record.entry(field).unwrap();
        assert_eq!(entry.source, StrategyKind::LabeledRow, "{field}");
    }
    assert_eq!(record.number("previous_close"), Some(12.75));
    assert_eq!(record.get("volume"), Some(&FieldValue::Integer(1_204_311)));
    assert_eq!(record.get("avg_volume"), Some(&FieldValue::Integer(980_020)));
    assert_eq!(record.number("beta"), Some(1.08));
    assert_eq!(record.number("dividend_yield"), Some(3.20));
}

#[test]
fn test_embedded_json_prefers_page_ticker() {
    let record = extract(RELATED_TICKERS_QUOTE, "ACME");
    let price = record.entry("current_price").unwrap();
    assert_eq!(price.source, StrategyKind::EmbeddedJson);
    assert_eq!(price.value, FieldValue::Number(12.5));
}
