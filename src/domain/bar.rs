//! OHLCV bars, timeframes, and candle geometry.
//!
//! `Bar` is the immutable price sample every detector consumes. The
//! [`CandleExt`] trait adds the geometric measurements (body, range,
//! shadows) that candle rules are written in terms of. Prices stay in
//! `Decimal`; dimensionless ratios are returned as `f64`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::Symbol;

/// Supported bar intervals, shortest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// Wall-clock span of one bar at this timeframe.
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::M15 => Duration::minutes(15),
            Timeframe::H1 => Duration::hours(1),
            Timeframe::H4 => Duration::hours(4),
            Timeframe::D1 => Duration::days(1),
        }
    }

    /// Short label used in configs and logs ("15m", "1h", "4h", "1d").
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "15m" => Ok(Timeframe::M15),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" => Ok(Timeframe::D1),
            other => Err(format!("unknown timeframe: {other}")),
        }
    }
}

/// Directional read of a candle or pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Bullish => "bullish",
            Direction::Bearish => "bearish",
            Direction::Neutral => "neutral",
        };
        write!(f, "{s}")
    }
}

/// One OHLCV sample. Immutable once emitted by the data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Candle geometry derived from a single bar.
///
/// Absolute measurements (body, range, shadows) are in price units;
/// the `*_ratio` accessors normalize against the bar's full range and
/// return 0.0 for degenerate zero-range bars.
pub trait CandleExt {
    /// Absolute distance between open and close.
    fn body(&self) -> Decimal;
    /// Full high-to-low extent.
    fn range(&self) -> Decimal;
    /// Distance from the body top to the high.
    fn upper_shadow(&self) -> Decimal;
    /// Distance from the low to the body bottom.
    fn lower_shadow(&self) -> Decimal;
    /// Midpoint of the high-low range.
    fn midpoint(&self) -> Decimal;
    /// Close above open.
    fn is_bullish(&self) -> bool;
    /// Close below open.
    fn is_bearish(&self) -> bool;
    /// Body as a fraction of the range, in [0, 1].
    fn body_ratio(&self) -> f64;
    /// Upper shadow as a fraction of the range, in [0, 1].
    fn upper_shadow_ratio(&self) -> f64;
    /// Lower shadow as a fraction of the range, in [0, 1].
    fn lower_shadow_ratio(&self) -> f64;
}

fn ratio(part: Decimal, whole: Decimal) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    (part / whole).to_f64().unwrap_or(0.0)
}

impl CandleExt for Bar {
    fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    fn range(&self) -> Decimal {
        self.high - self.low
    }

    fn upper_shadow(&self) -> Decimal {
        self.high - self.open.max(self.close)
    }

    fn lower_shadow(&self) -> Decimal {
        self.open.min(self.close) - self.low
    }

    fn midpoint(&self) -> Decimal {
        (self.high + self.low) / Decimal::TWO
    }

    fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    fn body_ratio(&self) -> f64 {
        ratio(self.body(), self.range())
    }

    fn upper_shadow_ratio(&self) -> f64 {
        ratio(self.upper_shadow(), self.range())
    }

    fn lower_shadow_ratio(&self) -> f64 {
        ratio(self.lower_shadow(), self.range())
    }
}
