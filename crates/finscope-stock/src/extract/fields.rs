//! Default field catalog for Yahoo Finance quote pages

use super::{FieldSpec, RangePart};
use crate::normalize::ValueKind;

const CHANGE_PERCENT: &str = r"\(?([+\-]?[0-9.]+%?)\)?";
const PRICE_TOKEN: &str = r"(-?\$?[0-9][0-9,]*(?:\.[0-9]+)?)";

fn streamer(field: &str) -> String {
    format!(r#"fin-streamer[data-symbol="{{symbol}}"][data-field="{field}"]"#)
}

fn labeled(label: &str) -> String {
    format!(r"(?i){label}\s*:?\s*{PRICE_TOKEN}")
}

/// Quote fields in display order
pub fn default_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("company_name", ValueKind::Text)
            .selector("h1")
            .embedded_json("longName")
            .embedded_json("shortName")
            .meta_tag("og:title")
            .capture(r"^(.+?)\s*\("),
        FieldSpec::new("current_price", ValueKind::Currency)
            .selector(streamer("regularMarketPrice"))
            .selector(r#"[data-testid="qsp-price"]"#)
            .embedded_json("regularMarketPrice")
            .meta_tag("price")
            .label(r"(?i)(?:current|last)\s+price\s*:?\s*(\$?[0-9][0-9,]*(?:\.[0-9]+)?)")
            .numeric_scan(r"\$([0-9]{1,3}(?:,[0-9]{3})*\.[0-9]{2})\b"),
        FieldSpec::new("price_change", ValueKind::SignedCurrency)
            .selector(streamer("regularMarketChange"))
            .selector(r#"[data-testid="qsp-price-change"]"#)
            .embedded_json("regularMarketChange"),
        FieldSpec::new("price_change_percent", ValueKind::Percentage)
            .selector(streamer("regularMarketChangePercent"))
            .capture(CHANGE_PERCENT)
            .selector(r#"[data-testid="qsp-price-change-percent"]"#)
            .capture(CHANGE_PERCENT)
            .embedded_json("regularMarketChangePercent"),
        FieldSpec::new("previous_close", ValueKind::Currency)
            .selector(streamer("regularMarketPreviousClose"))
            .selector(r#"[data-test="PREV_CLOSE-value"]"#)
            .embedded_json("regularMarketPreviousClose")
            .labeled_row(&["previous close"])
            .label(&labeled("previous close")),
        FieldSpec::new("open_price", ValueKind::Currency)
            .selector(streamer("regularMarketOpen"))
            .selector(r#"[data-test="OPEN-value"]"#)
            .embedded_json("regularMarketOpen")
            .labeled_row(&["open"])
            .label(&labeled("open")),
        FieldSpec::new("day_low", ValueKind::Currency)
            .selector(streamer("regularMarketDayRange"))
            .embedded_json("regularMarketDayLow")
            .labeled_row(&["day's range", "day range"])
            .part(RangePart::Low),
        FieldSpec::new("day_high", ValueKind::Currency)
            .selector(streamer("regularMarketDayRange"))
            .embedded_json("regularMarketDayHigh")
            .labeled_row(&["day's range", "day range"])
            .part(RangePart::High),
        FieldSpec::new("week_52_low", ValueKind::Currency)
            .selector(streamer("fiftyTwoWeekRange"))
            .embedded_json("fiftyTwoWeekLow")
            .labeled_row(&["52 week range", "52-week range"])
            .part(RangePart::Low),
        FieldSpec::new("week_52_high", ValueKind::Currency)
            .selector(streamer("fiftyTwoWeekRange"))
            .embedded_json("fiftyTwoWeekHigh")
            .labeled_row(&["52 week range", "52-week range"])
            .part(RangePart::High),
        FieldSpec::new("volume", ValueKind::Count)
            .selector(streamer("regularMarketVolume"))
            .selector(r#"[data-test="TD_VOLUME-value"]"#)
            .embedded_json("regularMarketVolume")
            .labeled_row(&["volume"]),
        FieldSpec::new("avg_volume", ValueKind::Count)
            .selector(r#"[data-test="AVERAGE_VOLUME_3MONTH-value"]"#)
            .embedded_json("averageDailyVolume3Month")
            .labeled_row(&["avg. volume", "average volume"]),
        FieldSpec::new("market_cap", ValueKind::LargeNumber)
            .selector(streamer("marketCap"))
            .selector(r#"[data-test="MARKET_CAP-value"]"#)
            .embedded_json("marketCap")
            .labeled_row(&["market cap"])
            .label(r"(?i)market cap[^:0-9]*:?\s*([0-9][0-9,.]*\s*[KMBT])\b"),
        FieldSpec::new("pe_ratio", ValueKind::Ratio)
            .selector(r#"[data-test="PE_RATIO-value"]"#)
            .embedded_json("trailingPE")
            .labeled_row(&["pe ratio", "p/e ratio"]),
        FieldSpec::new("eps", ValueKind::Ratio)
            .selector(r#"[data-test="EPS_RATIO-value"]"#)
            .embedded_json("epsTrailingTwelveMonths")
            .labeled_row(&["eps"]),
        FieldSpec::new("beta", ValueKind::Ratio)
            .selector(r#"[data-test="BETA_5Y-value"]"#)
            .embedded_json("beta")
            .labeled_row(&["beta"]),
        FieldSpec::new("dividend_yield", ValueKind::Percentage)
            .selector(r#"[data-test="DIVIDEND_AND_YIELD-value"]"#)
            .capture(r"\(([^)]+)\)")
            .labeled_row(&["forward dividend", "dividend & yield", "dividend yield"])
            .capture(r"\(([^)]+)\)"),
    ]
}
