//! Trend and support/resistance analysis over a whole series

use serde::{Deserialize, Serialize};

use super::PriceSeries;

/// Fewest bars worth analysing
pub const MIN_PATTERN_POINTS: usize = 10;

/// Slope (price units per bar) separating a trend from sideways drift
const SLOPE_THRESHOLD: f64 = 0.1;

/// Levels kept on each side
const MAX_LEVELS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Sideways,
}

/// Least-squares line through the closes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    /// |Pearson correlation| between bar index and close, in [0, 1]
    pub strength: f64,
    pub slope: f64,
}

/// Local extremes of the highs and lows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    /// Highest first
    pub resistance: Vec<f64>,
    /// Lowest first
    pub support: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub trend: Trend,
    pub support_resistance: SupportResistance,
}

/// Trend and levels, or `None` below [`MIN_PATTERN_POINTS`] bars
pub fn analyze_patterns(series: &PriceSeries) -> Option<PatternAnalysis> {
    if series.len() < MIN_PATTERN_POINTS {
        return None;
    }
    Some(PatternAnalysis {
        trend: trend(&series.closes())?,
        support_resistance: support_resistance(&series.highs(), &series.lows()),
    })
}

pub fn trend(closes: &[f64]) -> Option<Trend> {
    if closes.len() < 2 {
        return None;
    }

    let n = closes.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = closes.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (i, &y) in closes.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let slope = sxy / sxx;
    let strength = if syy == 0.0 {
        0.0
    } else {
        (sxy / (sxx * syy).sqrt()).abs().min(1.0)
    };
    let direction = if slope > SLOPE_THRESHOLD {
        TrendDirection::Bullish
    } else if slope < -SLOPE_THRESHOLD {
        TrendDirection::Bearish
    } else {
        TrendDirection::Sideways
    };

    Some(Trend {
        direction,
        strength,
        slope,
    })
}

/// Strict local maxima of `highs` and minima of `lows`, deduplicated
pub fn support_resistance(highs: &[f64], lows: &[f64]) -> SupportResistance {
    let peaks = |values: &[f64], better: fn(f64, f64) -> bool| -> Vec<f64> {
        values
            .windows(3)
            .filter(|w| better(w[1], w[0]) && better(w[1], w[2]))
            .map(|w| w[1])
            .collect()
    };

    let mut resistance = peaks(highs, |a, b| a > b);
    resistance.sort_by(|a, b| b.total_cmp(a));
    resistance.dedup();
    resistance.truncate(MAX_LEVELS);

    let mut support = peaks(lows, |a, b| a < b);
    support.sort_by(f64::total_cmp);
    support.dedup();
    support.truncate(MAX_LEVELS);

    SupportResistance {
        resistance,
        support,
    }
}
