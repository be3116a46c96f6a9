//! Technical indicators computed over bar history.
//!
//! Pure functions over `&[Bar]` slices ordered oldest to newest. All
//! return `None` when the history is too short rather than guessing.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::bar::{Bar, CandleExt, Direction};

/// Price regime classification for a bar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Trending(Direction),
    Ranging,
}

impl Regime {
    /// Regime label for logs and explanations.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Trending(Direction::Bullish) => "uptrend",
            Regime::Trending(Direction::Bearish) => "downtrend",
            Regime::Trending(Direction::Neutral) => "drifting",
            Regime::Ranging => "ranging",
        }
    }
}

/// Rate of change over the trailing `lookback` bars, as a fraction.
///
/// `(last_close - first_close) / first_close` where `first` is
/// `lookback` bars before the end of the slice.
#[must_use]
pub fn rate_of_change(bars: &[Bar], lookback: usize) -> Option<f64> {
    if lookback == 0 || bars.len() <= lookback {
        return None;
    }
    let last = bars.last()?.close;
    let first = bars[bars.len() - 1 - lookback].close;
    if first.is_zero() {
        return None;
    }
    ((last - first) / first).to_f64()
}

/// Threshold on |rate of change| separating trending from ranging.
const REGIME_ROC_THRESHOLD: f64 = 0.02;

/// Default lookback used for regime and trend classification.
pub const REGIME_LOOKBACK: usize = 20;

/// Classify the window as trending or ranging from its rate of change.
///
/// A move of more than 2% over the lookback counts as a trend; shorter
/// histories fall back to whatever lookback is available.
#[must_use]
pub fn detect_regime(bars: &[Bar]) -> Regime {
    let lookback = REGIME_LOOKBACK.min(bars.len().saturating_sub(1));
    match rate_of_change(bars, lookback) {
        Some(roc) if roc > REGIME_ROC_THRESHOLD => Regime::Trending(Direction::Bullish),
        Some(roc) if roc < -REGIME_ROC_THRESHOLD => Regime::Trending(Direction::Bearish),
        _ => Regime::Ranging,
    }
}

/// Direction of the recent move leading into the latest bar.
///
/// Used by reversal rules to check their prior-trend precondition.
#[must_use]
pub fn trend_direction(bars: &[Bar], lookback: usize) -> Direction {
    let lookback = lookback.min(bars.len().saturating_sub(1));
    match rate_of_change(bars, lookback) {
        Some(roc) if roc > REGIME_ROC_THRESHOLD => Direction::Bullish,
        Some(roc) if roc < -REGIME_ROC_THRESHOLD => Direction::Bearish,
        _ => Direction::Neutral,
    }
}

/// Simple moving average of closes over the trailing `period` bars.
#[must_use]
pub fn sma_close(bars: &[Bar], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let sum: Decimal = bars[bars.len() - period..].iter().map(|b| b.close).sum();
    Some(sum / Decimal::from(period))
}

/// Average volume over the trailing `period` bars.
#[must_use]
pub fn avg_volume(bars: &[Bar], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let sum: Decimal = bars[bars.len() - period..].iter().map(|b| b.volume).sum();
    Some(sum / Decimal::from(period))
}

/// Average candle body over the trailing `period` bars.
#[must_use]
pub fn avg_body(bars: &[Bar], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let sum: Decimal = bars[bars.len() - period..].iter().map(CandleExt::body).sum();
    Some(sum / Decimal::from(period))
}

/// Average true range over the trailing `period` bars.
///
/// True range of a bar includes the gap against the previous close, so
/// `period + 1` bars are required.
#[must_use]
pub fn atr(bars: &[Bar], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let start = bars.len() - period;
    let mut sum = Decimal::ZERO;
    for i in start..bars.len() {
        let prev_close = bars[i - 1].close;
        let bar = &bars[i];
        let tr = (bar.high - bar.low)
            .max((bar.high - prev_close).abs())
            .max((bar.low - prev_close).abs());
        sum += tr;
    }
    Some(sum / Decimal::from(period))
}

/// Highest high over the trailing `lookback` bars, excluding the last bar.
#[must_use]
pub fn swing_high(bars: &[Bar], lookback: usize) -> Option<Decimal> {
    if lookback == 0 || bars.len() < 2 {
        return None;
    }
    let end = bars.len() - 1;
    let start = end.saturating_sub(lookback);
    bars[start..end].iter().map(|b| b.high).max()
}

/// Lowest low over the trailing `lookback` bars, excluding the last bar.
#[must_use]
pub fn swing_low(bars: &[Bar], lookback: usize) -> Option<Decimal> {
    if lookback == 0 || bars.len() < 2 {
        return None;
    }
    let end = bars.len() - 1;
    let start = end.saturating_sub(lookback);
    bars[start..end].iter().map(|b| b.low).min()
}

/// Population variance of a score slice.
#[must_use]
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
