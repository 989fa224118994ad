//! Technical indicator engine
//!
//! [`compute`] is a pure function of a [`PriceSeries`]. Every output line is
//! aligned with the series: one slot per bar, `None` where the indicator is
//! not defined. Too little data is never an error.

mod math;
mod patterns;
mod series;

pub use math::{
    Bands, MacdLines, bollinger, ema, macd, price_change, rsi, sma, volatility, volume_ratio,
};
pub use patterns::{
    MIN_PATTERN_POINTS, PatternAnalysis, SupportResistance, Trend, TrendDirection,
    analyze_patterns, support_resistance, trend,
};
pub use series::{PricePoint, PriceSeries};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::StockError;

/// An indicator and its parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorRequest {
    Sma(usize),
    Ema(usize),
    Macd { fast: usize, slow: usize, signal: usize },
    Rsi(usize),
    Bollinger { window: usize, k: f64 },
    VolumeAverage(usize),
    /// Latest volume over its moving average
    VolumeRatio(usize),
    PriceChange(usize),
    Volatility(usize),
}

impl IndicatorRequest {
    pub const MACD: Self = Self::Macd {
        fast: 12,
        slow: 26,
        signal: 9,
    };

    /// The standard indicator set for a quote overview
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::Sma(20),
            Self::Sma(50),
            Self::Sma(200),
            Self::Ema(12),
            Self::Ema(26),
            Self::MACD,
            Self::Rsi(14),
            Self::Bollinger { window: 20, k: 2.0 },
            Self::VolumeAverage(20),
            Self::VolumeRatio(20),
            Self::PriceChange(1),
            Self::PriceChange(5),
            Self::PriceChange(20),
            Self::Volatility(20),
        ]
    }

    /// Key under which the result is stored, e.g. `sma_20` or `change_5d`
    pub fn name(&self) -> String {
        match *self {
            Self::Sma(w) => format!("sma_{w}"),
            Self::Ema(w) => format!("ema_{w}"),
            Self::Macd { fast, slow, signal } if (fast, slow, signal) == (12, 26, 9) => {
                "macd".to_string()
            }
            Self::Macd { fast, slow, signal } => format!("macd_{fast}_{slow}_{signal}"),
            Self::Rsi(w) => format!("rsi_{w}"),
            Self::Bollinger { window, k } if k == 2.0 => format!("bollinger_{window}"),
            Self::Bollinger { window, k } => format!("bollinger_{window}_{k}"),
            Self::VolumeAverage(w) => format!("volume_avg_{w}"),
            Self::VolumeRatio(w) => format!("volume_ratio_{w}"),
            Self::PriceChange(d) => format!("change_{d}d"),
            Self::Volatility(w) => format!("volatility_{w}"),
        }
    }

    fn evaluate(&self, series: &PriceSeries) -> IndicatorSeries {
        let closes = series.closes();
        match *self {
            Self::Sma(w) => IndicatorSeries::Line { values: sma(&closes, w) },
            Self::Ema(w) => IndicatorSeries::Line { values: ema(&closes, w) },
            Self::Macd { fast, slow, signal } => {
                let lines = macd(&closes, fast, slow, signal);
                IndicatorSeries::Macd {
                    macd: lines.macd,
                    signal: lines.signal,
                    histogram: lines.histogram,
                }
            }
            Self::Rsi(w) => IndicatorSeries::Line { values: rsi(&closes, w) },
            Self::Bollinger { window, k } => {
                let bands = bollinger(&closes, window, k);
                IndicatorSeries::Bands {
                    upper: bands.upper,
                    middle: bands.middle,
                    lower: bands.lower,
                }
            }
            Self::VolumeAverage(w) => IndicatorSeries::Line {
                values: sma(&series.volumes(), w),
            },
            Self::VolumeRatio(w) => IndicatorSeries::Line {
                values: volume_ratio(&series.volumes(), w),
            },
            Self::PriceChange(d) => IndicatorSeries::Line {
                values: price_change(&closes, d),
            },
            Self::Volatility(w) => IndicatorSeries::Line {
                values: volatility(&closes, w),
            },
        }
    }
}

impl fmt::Display for IndicatorRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn parse_param<T: FromStr>(input: &str, raw: &str) -> Result<T, StockError> {
    raw.parse()
        .map_err(|_| StockError::UnknownIndicator(input.to_string()))
}

impl FromStr for IndicatorRequest {
    type Err = StockError;

    /// Accepts the names produced by [`IndicatorRequest::name`] plus bare
    /// names (`sma`, `rsi`, `bollinger`, ...) that take the usual defaults.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let (head, rest) = match lower.split_once('_') {
            Some((head, rest)) => (head, Some(rest)),
            None => (lower.as_str(), None),
        };

        let window = |default: usize| -> Result<usize, StockError> {
            rest.map_or(Ok(default), |r| parse_param(s, r))
        };

        let request = match head {
            "sma" => Self::Sma(window(20)?),
            "ema" => Self::Ema(window(12)?),
            "rsi" => Self::Rsi(window(14)?),
            "volatility" => Self::Volatility(window(20)?),
            "macd" => match rest {
                None => Self::MACD,
                Some(r) => {
                    let parts: Vec<&str> = r.split('_').collect();
                    let [fast, slow, signal] = parts.as_slice() else {
                        return Err(StockError::UnknownIndicator(s.to_string()));
                    };
                    Self::Macd {
                        fast: parse_param(s, fast)?,
                        slow: parse_param(s, slow)?,
                        signal: parse_param(s, signal)?,
                    }
                }
            },
            "bollinger" | "bb" => match rest.map(|r| r.split_once('_')) {
                None => Self::Bollinger { window: 20, k: 2.0 },
                Some(None) => Self::Bollinger {
                    window: window(20)?,
                    k: 2.0,
                },
                Some(Some((w, k))) => Self::Bollinger {
                    window: parse_param(s, w)?,
                    k: parse_param(s, k)?,
                },
            },
            "volume" => {
                let Some((kind, w)) = rest.map(|r| r.split_once('_').unwrap_or((r, ""))) else {
                    return Err(StockError::UnknownIndicator(s.to_string()));
                };
                let w = if w.is_empty() { 20 } else { parse_param(s, w)? };
                match kind {
                    "avg" => Self::VolumeAverage(w),
                    "ratio" => Self::VolumeRatio(w),
                    _ => return Err(StockError::UnknownIndicator(s.to_string())),
                }
            }
            "change" => {
                let days = rest.map(|r| r.trim_end_matches('d')).unwrap_or("1");
                Self::PriceChange(parse_param(s, days)?)
            }
            _ => return Err(StockError::UnknownIndicator(s.to_string())),
        };
        Ok(request)
    }
}

/// Output of one indicator, aligned with the input series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorSeries {
    Line {
        values: Vec<Option<f64>>,
    },
    Macd {
        macd: Vec<Option<f64>>,
        signal: Vec<Option<f64>>,
        histogram: Vec<Option<f64>>,
    },
    Bands {
        upper: Vec<Option<f64>>,
        middle: Vec<Option<f64>>,
        lower: Vec<Option<f64>>,
    },
}

impl IndicatorSeries {
    /// Named component lines
    pub fn components(&self) -> Vec<(&'static str, &[Option<f64>])> {
        match self {
            Self::Line { values } => vec![("value", values.as_slice())],
            Self::Macd {
                macd,
                signal,
                histogram,
            } => vec![
                ("macd", macd.as_slice()),
                ("signal", signal.as_slice()),
                ("histogram", histogram.as_slice()),
            ],
            Self::Bands { upper, middle, lower } => vec![
                ("upper", upper.as_slice()),
                ("middle", middle.as_slice()),
                ("lower", lower.as_slice()),
            ],
        }
    }

    /// Main line: the value, the MACD line or the middle band
    pub fn primary(&self) -> &[Option<f64>] {
        match self {
            Self::Line { values } => values.as_slice(),
            Self::Macd { macd, .. } => macd.as_slice(),
            Self::Bands { middle, .. } => middle.as_slice(),
        }
    }

    /// Value of each component at the last bar
    pub fn latest(&self) -> BTreeMap<&'static str, Option<f64>> {
        self.components()
            .into_iter()
            .map(|(name, line)| (name, line.last().copied().flatten()))
            .collect()
    }

    /// True when no point is defined in any component
    pub fn is_absent(&self) -> bool {
        self.components()
            .iter()
            .all(|(_, line)| line.iter().all(Option::is_none))
    }
}

/// Indicators computed over one series, keyed by [`IndicatorRequest::name`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub points: usize,
    pub indicators: BTreeMap<String, IndicatorSeries>,
}

impl IndicatorSet {
    pub fn get(&self, name: &str) -> Option<&IndicatorSeries> {
        self.indicators.get(name)
    }

    /// Latest value of an indicator's main line
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.get(name)?.primary().last().copied().flatten()
    }

    /// Latest value of every component of every indicator, e.g. `macd.signal`
    pub fn latest_values(&self) -> BTreeMap<String, Option<f64>> {
        let mut out = BTreeMap::new();
        for (name, series) in &self.indicators {
            match series {
                IndicatorSeries::Line { values } => {
                    out.insert(name.clone(), values.last().copied().flatten());
                }
                other => {
                    for (component, value) in other.latest() {
                        out.insert(format!("{name}.{component}"), value);
                    }
                }
            }
        }
        out
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.indicators.keys().map(String::as_str)
    }
}

/// Compute the requested indicators over `series`
pub fn compute(series: &PriceSeries, requested: &[IndicatorRequest]) -> IndicatorSet {
    let indicators = requested
        .iter()
        .map(|request| {
            let output = request.evaluate(series);
            if output.is_absent() {
                tracing::debug!(
                    indicator = %request,
                    points = series.len(),
                    "Not enough data; indicator absent"
                );
            }
            (request.name(), output)
        })
        .collect();

    IndicatorSet {
        points: series.len(),
        indicators,
    }
}

/// Indicators plus whole-series trend and levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    pub indicators: IndicatorSet,
    /// `None` below [`MIN_PATTERN_POINTS`] bars
    pub patterns: Option<PatternAnalysis>,
}

pub fn analyze(series: &PriceSeries, requested: &[IndicatorRequest]) -> TechnicalAnalysis {
    TechnicalAnalysis {
        indicators: compute(series, requested),
        patterns: analyze_patterns(series),
    }
}
