//! Indicator math over plain `f64` slices
//!
//! Every function returns one slot per input point; `None` marks a point
//! where the indicator is not yet defined. Windows of zero or longer than the
//! input produce an all-`None` result.

use ta::Next;
use ta::indicators::SimpleMovingAverage;

const TRADING_DAYS: f64 = 252.0;

fn absent(len: usize) -> Vec<Option<f64>> {
    vec![None; len]
}

/// Simple moving average, defined from index `window - 1`
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 || window > values.len() {
        return absent(values.len());
    }
    let Ok(mut indicator) = SimpleMovingAverage::new(window) else {
        return absent(values.len());
    };

    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let mean = indicator.next(v);
            (i + 1 >= window).then_some(mean)
        })
        .collect()
}

/// Exponential moving average seeded with the SMA of the first `window` points
pub fn ema(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = absent(values.len());
    if window == 0 || window > values.len() {
        return out;
    }

    let k = 2.0 / (window as f64 + 1.0);
    let mut prev = values[..window].iter().sum::<f64>() / window as f64;
    out[window - 1] = Some(prev);
    for (i, &v) in values.iter().enumerate().skip(window) {
        prev = v * k + prev * (1.0 - k);
        out[i] = Some(prev);
    }
    out
}

/// EMA over a series whose leading points may be undefined
fn ema_of_defined(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let start = values.iter().position(Option::is_some).unwrap_or(values.len());
    let defined: Vec<f64> = values[start..].iter().map_while(|v| *v).collect();

    let mut out = absent(start);
    out.extend(ema(&defined, window));
    out.resize(values.len(), None);
    out
}

/// MACD line, signal line and histogram
pub struct MacdLines {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdLines {
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);

    let macd: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal = ema_of_defined(&macd, signal);
    let histogram = macd
        .iter()
        .zip(&signal)
        .map(|(m, s)| Some((*m)? - (*s)?))
        .collect();

    MacdLines {
        macd,
        signal,
        histogram,
    }
}

/// Wilder's RSI, defined from index `window`
pub fn rsi(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = absent(values.len());
    if window == 0 || window >= values.len() {
        return out;
    }

    let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let w = window as f64;

    let mut avg_gain = changes[..window].iter().map(|c| c.max(0.0)).sum::<f64>() / w;
    let mut avg_loss = changes[..window].iter().map(|c| (-c).max(0.0)).sum::<f64>() / w;
    out[window] = Some(rsi_value(avg_gain, avg_loss));

    for (i, &change) in changes.iter().enumerate().skip(window) {
        avg_gain = (avg_gain * (w - 1.0) + change.max(0.0)) / w;
        avg_loss = (avg_loss * (w - 1.0) + (-change).max(0.0)) / w;
        out[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

/// Upper, middle and lower Bollinger bands
pub struct Bands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

pub fn bollinger(values: &[f64], window: usize, k: f64) -> Bands {
    let middle = sma(values, window);
    let mut upper = absent(values.len());
    let mut lower = absent(values.len());

    for (i, mean) in middle.iter().enumerate() {
        let Some(mean) = *mean else { continue };
        let slice = &values[i + 1 - window..=i];
        let sd = population_stddev(slice, mean);
        upper[i] = Some(mean + k * sd);
        lower[i] = Some(mean - k * sd);
    }

    Bands { upper, middle, lower }
}

pub(crate) fn population_stddev(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Percent change against the close `days` points earlier
pub fn price_change(values: &[f64], days: usize) -> Vec<Option<f64>> {
    let mut out = absent(values.len());
    if days == 0 {
        return out;
    }
    for i in days..values.len() {
        let base = values[i - days];
        if base != 0.0 {
            out[i] = Some((values[i] - base) / base * 100.0);
        }
    }
    out
}

/// Each value over the simple average of the last `window` values
///
/// Undefined where the average is undefined or zero.
pub fn volume_ratio(values: &[f64], window: usize) -> Vec<Option<f64>> {
    sma(values, window)
        .into_iter()
        .zip(values)
        .map(|(avg, &v)| avg.filter(|a| *a != 0.0).map(|a| v / a))
        .collect()
}

/// Annualised sample stddev of daily percent returns over `window` returns
pub fn volatility(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = absent(values.len());
    if window < 2 || window >= values.len() {
        return out;
    }

    let returns: Vec<f64> = values
        .windows(2)
        .map(|w| if w[0] == 0.0 { f64::NAN } else { (w[1] / w[0] - 1.0) * 100.0 })
        .collect();

    for end in window..=returns.len() {
        let slice = &returns[end - window..end];
        if slice.iter().any(|r| !r.is_finite()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let variance =
            slice.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (window as f64 - 1.0);
        // returns[end - 1] is the move into point `end`
        out[end] = Some(variance.sqrt() * TRADING_DAYS.sqrt());
    }
    out
}
