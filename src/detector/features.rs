//! Feature extraction for the learned detector.
//!
//! Produces a fixed-width vector of normalized features from the tail
//! of a bar window. The width is part of a model's contract: a stored
//! `ModelVersion` refuses to score vectors of a different width, so
//! changing this layout requires retraining from scratch.

use rust_decimal::prelude::ToPrimitive;

use crate::domain::indicators;
use crate::domain::{Bar, CandleExt};

/// Width of every extracted feature vector.
pub const FEATURE_COUNT: usize = 12;

const VOLUME_PERIOD: usize = 20;
const ATR_PERIOD: usize = 14;
const TREND_LOOKBACK: usize = 20;

/// Bars required before extraction succeeds (trend ROC endpoint plus
/// the bar it measures from).
const MIN_BARS: usize = TREND_LOOKBACK + 1;

/// A fixed-width normalized feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Extract features from a window ordered oldest to newest.
    ///
    /// Returns `None` when the window is too short.
    #[must_use]
    pub fn extract(bars: &[Bar]) -> Option<Self> {
        if bars.len() < MIN_BARS {
            return None;
        }
        let last = bars.last()?;
        let prev = &bars[bars.len() - 2];

        let roc_1 = indicators::rate_of_change(bars, 1)?;
        let roc_3 = indicators::rate_of_change(bars, 3)?;
        let roc_5 = indicators::rate_of_change(bars, 5)?;
        let trend = indicators::rate_of_change(bars, TREND_LOOKBACK)?;

        let close_position = if last.range().is_zero() {
            0.5
        } else {
            ((last.close - last.low) / last.range())
                .to_f64()
                .unwrap_or(0.5)
        };

        let avg_volume = indicators::avg_volume(bars, VOLUME_PERIOD)?;
        let volume_ratio = if avg_volume.is_zero() {
            1.0
        } else {
            (last.volume / avg_volume).to_f64().unwrap_or(1.0)
        };

        let atr = indicators::atr(bars, ATR_PERIOD)?;
        let range_vs_atr = if atr.is_zero() {
            1.0
        } else {
            (last.range() / atr).to_f64().unwrap_or(1.0)
        };

        let gap = if prev.close.is_zero() {
            0.0
        } else {
            ((last.open - prev.close) / prev.close)
                .to_f64()
                .unwrap_or(0.0)
        };

        let direction_flag = if last.is_bullish() {
            1.0
        } else if last.is_bearish() {
            -1.0
        } else {
            0.0
        };

        Some(Self(vec![
            squash(roc_1, 0.05),
            squash(roc_3, 0.08),
            squash(roc_5, 0.10),
            last.body_ratio(),
            last.upper_shadow_ratio(),
            last.lower_shadow_ratio(),
            close_position,
            (volume_ratio / 3.0).clamp(0.0, 1.0),
            (range_vs_atr / 3.0).clamp(0.0, 1.0),
            squash(gap, 0.03),
            squash(trend, 0.20),
            direction_flag,
        ]))
    }

    /// The feature values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Consume into the raw vector (for `feature_snapshot` storage).
    #[must_use]
    pub fn into_values(self) -> Vec<f64> {
        self.0
    }
}

/// Map a fractional move into [-1, 1], saturating at `scale`.
fn squash(value: f64, scale: f64) -> f64 {
    (value / scale).clamp(-1.0, 1.0)
}
