//! Two-candle rules.

use rust_decimal::Decimal;

use crate::domain::bar::{Bar, CandleExt, Direction};

use super::{price_ratio, scaled, trend_boost, volume_boost, CandleRule, RuleContext, RuleMatch};

fn last_two(bars: &[Bar]) -> Option<(&Bar, &Bar)> {
    if bars.len() < 2 {
        return None;
    }
    Some((&bars[bars.len() - 2], &bars[bars.len() - 1]))
}

/// Midpoint of a bar's open-close body.
fn body_mid(bar: &Bar) -> Decimal {
    (bar.open + bar.close) / Decimal::TWO
}

/// Bullish engulfing: a bullish body that swallows the prior bearish
/// body entirely. The wider the engulfing body relative to the prior
/// one, the stronger the read.
pub struct BullishEngulfing;

impl CandleRule for BullishEngulfing {
    fn name(&self) -> &'static str {
        "bullish_engulfing"
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let (prev, curr) = last_two(bars)?;
        if !prev.is_bearish() || !curr.is_bullish() {
            return None;
        }
        if curr.open > prev.close || curr.close < prev.open {
            return None;
        }
        if curr.body() <= prev.body() {
            return None;
        }
        let size_ratio = price_ratio(curr.body(), prev.body())?;
        let exceedance = ((size_ratio - 1.0) / 1.5).clamp(0.0, 1.0);
        let confidence = (scaled(0.60, 0.20, exceedance)
            + trend_boost(Direction::Bearish, ctx)
            + volume_boost(curr, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bullish,
            confidence,
        })
    }
}

/// Bearish engulfing: mirror of the bullish case at the top of a rise.
pub struct BearishEngulfing;

impl CandleRule for BearishEngulfing {
    fn name(&self) -> &'static str {
        "bearish_engulfing"
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let (prev, curr) = last_two(bars)?;
        if !prev.is_bullish() || !curr.is_bearish() {
            return None;
        }
        if curr.open < prev.close || curr.close > prev.open {
            return None;
        }
        if curr.body() <= prev.body() {
            return None;
        }
        let size_ratio = price_ratio(curr.body(), prev.body())?;
        let exceedance = ((size_ratio - 1.0) / 1.5).clamp(0.0, 1.0);
        let confidence = (scaled(0.60, 0.20, exceedance)
            + trend_boost(Direction::Bullish, ctx)
            + volume_boost(curr, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bearish,
            confidence,
        })
    }
}

fn harami_shape(prev: &Bar, curr: &Bar, ctx: &RuleContext) -> Option<f64> {
    // The mother bar must be a real body, not noise.
    if prev.body() < ctx.avg_body {
        return None;
    }
    let body_hi = curr.open.max(curr.close);
    let body_lo = curr.open.min(curr.close);
    if body_hi > prev.open.max(prev.close) || body_lo < prev.open.min(prev.close) {
        return None;
    }
    let ratio = price_ratio(curr.body(), prev.body())?;
    if ratio > 0.6 {
        return None;
    }
    Some((1.0 - ratio / 0.6).clamp(0.0, 1.0))
}

/// Bullish harami: a small bullish body held inside a large bearish one.
pub struct BullishHarami;

impl CandleRule for BullishHarami {
    fn name(&self) -> &'static str {
        "bullish_harami"
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let (prev, curr) = last_two(bars)?;
        if !prev.is_bearish() || !curr.is_bullish() {
            return None;
        }
        let exceedance = harami_shape(prev, curr, ctx)?;
        let confidence =
            (scaled(0.45, 0.15, exceedance) + trend_boost(Direction::Bearish, ctx)).clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bullish,
            confidence,
        })
    }
}

/// Bearish harami: a small bearish body held inside a large bullish one.
pub struct BearishHarami;

impl CandleRule for BearishHarami {
    fn name(&self) -> &'static str {
        "bearish_harami"
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let (prev, curr) = last_two(bars)?;
        if !prev.is_bullish() || !curr.is_bearish() {
            return None;
        }
        let exceedance = harami_shape(prev, curr, ctx)?;
        let confidence =
            (scaled(0.45, 0.15, exceedance) + trend_boost(Direction::Bullish, ctx)).clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bearish,
            confidence,
        })
    }
}

/// Piercing line: a bullish bar opening at or below the prior bearish
/// close and reclaiming more than half of its body.
pub struct PiercingLine;

impl CandleRule for PiercingLine {
    fn name(&self) -> &'static str {
        "piercing_line"
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let (prev, curr) = last_two(bars)?;
        if !prev.is_bearish() || !curr.is_bullish() {
            return None;
        }
        if curr.open > prev.close {
            return None;
        }
        let mid = body_mid(prev);
        if curr.close <= mid || curr.close >= prev.open {
            return None;
        }
        let penetration = price_ratio(curr.close - mid, prev.open - mid)?;
        let confidence = (scaled(0.50, 0.20, penetration)
            + trend_boost(Direction::Bearish, ctx)
            + volume_boost(curr, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bullish,
            confidence,
        })
    }
}

/// Dark cloud cover: a bearish bar opening at or above the prior
/// bullish close and giving back more than half of its body.
pub struct DarkCloudCover;

impl CandleRule for DarkCloudCover {
    fn name(&self) -> &'static str {
        "dark_cloud_cover"
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let (prev, curr) = last_two(bars)?;
        if !prev.is_bullish() || !curr.is_bearish() {
            return None;
        }
        if curr.open < prev.close {
            return None;
        }
        let mid = body_mid(prev);
        if curr.close >= mid || curr.close <= prev.open {
            return None;
        }
        let penetration = price_ratio(mid - curr.close, mid - prev.open)?;
        let confidence = (scaled(0.50, 0.20, penetration)
            + trend_boost(Direction::Bullish, ctx)
            + volume_boost(curr, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bearish,
            confidence,
        })
    }
}

/// Relative gap between two extremes, scaled by the tighter bar range.
fn extreme_gap(a: Decimal, b: Decimal, range_a: Decimal, range_b: Decimal) -> Option<f64> {
    let diff = (a - b).abs();
    price_ratio(diff, range_a.min(range_b))
}

/// Matching lows rejected twice in a row.
const TWEEZER_TOLERANCE: f64 = 0.1;

/// Tweezer bottom: two bars probing the same low, the second closing
/// back up.
pub struct TweezerBottom;

impl CandleRule for TweezerBottom {
    fn name(&self) -> &'static str {
        "tweezer_bottom"
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let (prev, curr) = last_two(bars)?;
        if !prev.is_bearish() || !curr.is_bullish() {
            return None;
        }
        let gap = extreme_gap(prev.low, curr.low, prev.range(), curr.range())?;
        if gap > TWEEZER_TOLERANCE {
            return None;
        }
        let exceedance = 1.0 - gap / TWEEZER_TOLERANCE;
        let confidence = (scaled(0.45, 0.15, exceedance)
            + trend_boost(Direction::Bearish, ctx)
            + volume_boost(curr, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bullish,
            confidence,
        })
    }
}

/// Tweezer top: two bars rejected at the same high, the second closing
/// back down.
pub struct TweezerTop;

impl CandleRule for TweezerTop {
    fn name(&self) -> &'static str {
        "tweezer_top"
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let (prev, curr) = last_two(bars)?;
        if !prev.is_bullish() || !curr.is_bearish() {
            return None;
        }
        let gap = extreme_gap(prev.high, curr.high, prev.range(), curr.range())?;
        if gap > TWEEZER_TOLERANCE {
            return None;
        }
        let exceedance = 1.0 - gap / TWEEZER_TOLERANCE;
        let confidence = (scaled(0.45, 0.15, exceedance)
            + trend_boost(Direction::Bullish, ctx)
            + volume_boost(curr, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bearish,
            confidence,
        })
    }
}
