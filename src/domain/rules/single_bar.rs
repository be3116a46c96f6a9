//! Single-candle rules.
//!
//! All thresholds are expressed against the bar's own range via the
//! `CandleExt` ratios, so the rules are scale-free. Reversal shapes
//! check the prior trend: a hammer shape inside an uptrend is read as
//! a hanging man, not a hammer, and vice versa for the star shapes.

use crate::domain::bar::{Bar, CandleExt, Direction};

use super::{scaled, trend_boost, volume_boost, CandleRule, RuleContext, RuleMatch};

/// Smallest body ratio treated as a real body rather than a doji.
const MIN_BODY: f64 = 0.05;

/// Largest body ratio a pin-bar style reversal candle may carry.
const MAX_PIN_BODY: f64 = 0.35;

fn pin_bar_shape(last: &Bar, long_side: f64, short_side: f64) -> Option<f64> {
    let body = last.body_ratio();
    if !(MIN_BODY..=MAX_PIN_BODY).contains(&body) {
        return None;
    }
    if short_side > 0.15 {
        return None;
    }
    let shadow_mult = long_side / body;
    if shadow_mult < 2.0 {
        return None;
    }
    Some(((shadow_mult - 2.0) / 2.0).clamp(0.0, 1.0))
}

/// Hammer: small body at the top, long lower shadow, after a decline.
pub struct Hammer;

impl CandleRule for Hammer {
    fn name(&self) -> &'static str {
        "hammer"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let last = bars.last()?;
        if ctx.trend == Direction::Bullish {
            return None;
        }
        let exceedance = pin_bar_shape(last, last.lower_shadow_ratio(), last.upper_shadow_ratio())?;
        let confidence = (scaled(0.50, 0.15, exceedance)
            + trend_boost(Direction::Bearish, ctx)
            + volume_boost(last, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bullish,
            confidence,
        })
    }
}

/// Hanging man: hammer geometry appearing inside an uptrend.
pub struct HangingMan;

impl CandleRule for HangingMan {
    fn name(&self) -> &'static str {
        "hanging_man"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let last = bars.last()?;
        if ctx.trend != Direction::Bullish {
            return None;
        }
        let exceedance = pin_bar_shape(last, last.lower_shadow_ratio(), last.upper_shadow_ratio())?;
        let confidence =
            (scaled(0.50, 0.15, exceedance) + 0.10 + volume_boost(last, ctx)).clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bearish,
            confidence,
        })
    }
}

/// Inverted hammer: long upper shadow after a decline.
pub struct InvertedHammer;

impl CandleRule for InvertedHammer {
    fn name(&self) -> &'static str {
        "inverted_hammer"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let last = bars.last()?;
        if ctx.trend == Direction::Bullish {
            return None;
        }
        let exceedance = pin_bar_shape(last, last.upper_shadow_ratio(), last.lower_shadow_ratio())?;
        let confidence = (scaled(0.45, 0.15, exceedance)
            + trend_boost(Direction::Bearish, ctx)
            + volume_boost(last, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bullish,
            confidence,
        })
    }
}

/// Shooting star: inverted-hammer geometry inside an uptrend.
pub struct ShootingStar;

impl CandleRule for ShootingStar {
    fn name(&self) -> &'static str {
        "shooting_star"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let last = bars.last()?;
        if ctx.trend != Direction::Bullish {
            return None;
        }
        let exceedance = pin_bar_shape(last, last.upper_shadow_ratio(), last.lower_shadow_ratio())?;
        let confidence =
            (scaled(0.50, 0.15, exceedance) + 0.10 + volume_boost(last, ctx)).clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bearish,
            confidence,
        })
    }
}

/// Plain doji: open and close nearly equal, shadows on both sides.
pub struct Doji;

impl CandleRule for Doji {
    fn name(&self) -> &'static str {
        "doji"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let last = bars.last()?;
        let body = last.body_ratio();
        if body >= MIN_BODY || last.range().is_zero() {
            return None;
        }
        // Long-shadow dojis belong to the dragonfly/gravestone rules.
        if last.lower_shadow_ratio() >= 0.60 || last.upper_shadow_ratio() >= 0.60 {
            return None;
        }
        let _ = ctx;
        let confidence = scaled(0.35, 0.15, 1.0 - body / MIN_BODY);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Neutral,
            confidence,
        })
    }
}

/// Dragonfly doji: no body, the whole range below as a lower shadow.
pub struct DragonflyDoji;

impl CandleRule for DragonflyDoji {
    fn name(&self) -> &'static str {
        "dragonfly_doji"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let last = bars.last()?;
        if last.body_ratio() >= MIN_BODY || last.range().is_zero() {
            return None;
        }
        let lower = last.lower_shadow_ratio();
        if lower < 0.60 || last.upper_shadow_ratio() > 0.10 {
            return None;
        }
        let exceedance = ((lower - 0.60) / 0.30).clamp(0.0, 1.0);
        let confidence = (scaled(0.50, 0.15, exceedance)
            + trend_boost(Direction::Bearish, ctx)
            + volume_boost(last, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bullish,
            confidence,
        })
    }
}

/// Gravestone doji: no body, the whole range above as an upper shadow.
pub struct GravestoneDoji;

impl CandleRule for GravestoneDoji {
    fn name(&self) -> &'static str {
        "gravestone_doji"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let last = bars.last()?;
        if last.body_ratio() >= MIN_BODY || last.range().is_zero() {
            return None;
        }
        let upper = last.upper_shadow_ratio();
        if upper < 0.60 || last.lower_shadow_ratio() > 0.10 {
            return None;
        }
        let exceedance = ((upper - 0.60) / 0.30).clamp(0.0, 1.0);
        let confidence = (scaled(0.50, 0.15, exceedance)
            + trend_boost(Direction::Bullish, ctx)
            + volume_boost(last, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bearish,
            confidence,
        })
    }
}

fn marubozu_shape(last: &Bar) -> Option<f64> {
    let body = last.body_ratio();
    if body < 0.90 {
        return None;
    }
    if last.upper_shadow_ratio() > 0.05 || last.lower_shadow_ratio() > 0.05 {
        return None;
    }
    Some(((body - 0.90) / 0.10).clamp(0.0, 1.0))
}

/// Bullish marubozu: full-range bullish body, continuation strength.
pub struct BullishMarubozu;

impl CandleRule for BullishMarubozu {
    fn name(&self) -> &'static str {
        "bullish_marubozu"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let last = bars.last()?;
        if !last.is_bullish() {
            return None;
        }
        let exceedance = marubozu_shape(last)?;
        let confidence = (scaled(0.55, 0.15, exceedance)
            + trend_boost(Direction::Bullish, ctx)
            + volume_boost(last, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bullish,
            confidence,
        })
    }
}

/// Bearish marubozu: full-range bearish body.
pub struct BearishMarubozu;

impl CandleRule for BearishMarubozu {
    fn name(&self) -> &'static str {
        "bearish_marubozu"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let last = bars.last()?;
        if !last.is_bearish() {
            return None;
        }
        let exceedance = marubozu_shape(last)?;
        let confidence = (scaled(0.55, 0.15, exceedance)
            + trend_boost(Direction::Bearish, ctx)
            + volume_boost(last, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bearish,
            confidence,
        })
    }
}

/// Spinning top: small body with meaningful shadows both sides.
pub struct SpinningTop;

impl CandleRule for SpinningTop {
    fn name(&self) -> &'static str {
        "spinning_top"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let last = bars.last()?;
        let body = last.body_ratio();
        if !(MIN_BODY..=MAX_PIN_BODY).contains(&body) {
            return None;
        }
        let upper = last.upper_shadow_ratio();
        let lower = last.lower_shadow_ratio();
        if upper < 0.25 || lower < 0.25 {
            return None;
        }
        let _ = ctx;
        let balance = 1.0 - ((upper - lower).abs() / 0.50).clamp(0.0, 1.0);
        let confidence = scaled(0.30, 0.10, balance);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Neutral,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::test_support::{bar, downtrend_window, flat_window, uptrend_window};
    use rust_decimal_macros::dec;

    fn eval(rule: &dyn CandleRule, mut window: Vec<Bar>, tail: Bar) -> Option<RuleMatch> {
        window.push(tail);
        let ctx = RuleContext::from_bars(&window).unwrap();
        rule.evaluate(&window, &ctx)
    }

    #[test]
    fn hammer_matches_in_downtrend() {
        // Range 10: body 2 at the top, lower shadow 7.5, upper 0.5.
        let tail = bar(dec!(99.5), dec!(102), dec!(92), dec!(101.5), dec!(250));
        let m = eval(&Hammer, downtrend_window(30), tail).unwrap();
        assert_eq!(m.direction, Direction::Bullish);
        assert!(m.confidence > 0.65, "confidence {}", m.confidence);
    }

    #[test]
    fn hammer_shape_in_uptrend_is_not_a_hammer() {
        let tail = bar(dec!(99.5), dec!(102), dec!(92), dec!(101.5), dec!(250));
        assert!(eval(&Hammer, uptrend_window(30), tail).is_none());
    }

    #[test]
    fn hanging_man_needs_the_uptrend() {
        let tail = bar(dec!(130.5), dec!(132), dec!(122), dec!(131.5), dec!(150));
        let m = eval(&HangingMan, uptrend_window(32), tail.clone()).unwrap();
        assert_eq!(m.direction, Direction::Bearish);
        assert!(eval(&HangingMan, downtrend_window(30), tail).is_none());
    }

    #[test]
    fn short_lower_shadow_is_no_hammer() {
        // Lower shadow only 1.7x the body.
        let tail = bar(dec!(97.4), dec!(102), dec!(92), dec!(100.6), dec!(100));
        assert!(eval(&Hammer, downtrend_window(30), tail).is_none());
    }

    #[test]
    fn inverted_hammer_matches_in_downtrend() {
        // Body 2 at the bottom, upper shadow 7.5.
        let tail = bar(dec!(99.5), dec!(109), dec!(99), dec!(101.5), dec!(200));
        let m = eval(&InvertedHammer, downtrend_window(30), tail).unwrap();
        assert_eq!(m.direction, Direction::Bullish);
    }

    #[test]
    fn shooting_star_matches_in_uptrend() {
        let tail = bar(dec!(130.5), dec!(140), dec!(130), dec!(132.5), dec!(200));
        let m = eval(&ShootingStar, uptrend_window(32), tail).unwrap();
        assert_eq!(m.direction, Direction::Bearish);
        assert!(m.confidence > 0.55);
    }

    #[test]
    fn doji_matches_tiny_body() {
        let tail = bar(dec!(100), dec!(102.5), dec!(97.5), dec!(100.1), dec!(100));
        let m = eval(&Doji, flat_window(30), tail).unwrap();
        assert_eq!(m.direction, Direction::Neutral);
        assert!(m.confidence < 0.55);
    }

    #[test]
    fn doji_rejects_real_body() {
        let tail = bar(dec!(100), dec!(102.5), dec!(97.5), dec!(101.5), dec!(100));
        assert!(eval(&Doji, flat_window(30), tail).is_none());
    }

    #[test]
    fn dragonfly_doji_matches_long_lower_shadow() {
        let tail = bar(dec!(100), dec!(100.2), dec!(94), dec!(100.05), dec!(220));
        let m = eval(&DragonflyDoji, downtrend_window(30), tail).unwrap();
        assert_eq!(m.direction, Direction::Bullish);
        assert!(m.confidence > 0.6);
    }

    #[test]
    fn gravestone_doji_matches_long_upper_shadow() {
        let tail = bar(dec!(131), dec!(137), dec!(130.9), dec!(131.05), dec!(220));
        let m = eval(&GravestoneDoji, uptrend_window(32), tail).unwrap();
        assert_eq!(m.direction, Direction::Bearish);
    }

    #[test]
    fn plain_doji_leaves_long_shadow_shapes_alone() {
        let tail = bar(dec!(100), dec!(100.2), dec!(94), dec!(100.05), dec!(100));
        assert!(eval(&Doji, downtrend_window(30), tail).is_none());
    }

    #[test]
    fn bullish_marubozu_full_body() {
        let tail = bar(dec!(100), dec!(105.1), dec!(99.9), dec!(105), dec!(180));
        let m = eval(&BullishMarubozu, uptrend_window(32), tail).unwrap();
        assert_eq!(m.direction, Direction::Bullish);
        assert!(m.confidence > 0.6);
    }

    #[test]
    fn bearish_marubozu_full_body() {
        let tail = bar(dec!(105), dec!(105.1), dec!(99.9), dec!(100), dec!(180));
        let m = eval(&BearishMarubozu, downtrend_window(30), tail).unwrap();
        assert_eq!(m.direction, Direction::Bearish);
    }

    #[test]
    fn marubozu_rejects_shadowed_bar() {
        let tail = bar(dec!(100), dec!(106), dec!(99), dec!(105), dec!(180));
        assert!(eval(&BullishMarubozu, uptrend_window(32), tail).is_none());
    }

    #[test]
    fn spinning_top_is_neutral_and_weak() {
        // Body 1 centered in a range of 10.
        let tail = bar(dec!(100), dec!(105), dec!(95), dec!(101), dec!(100));
        let m = eval(&SpinningTop, flat_window(30), tail).unwrap();
        assert_eq!(m.direction, Direction::Neutral);
        assert!(m.confidence < 0.5);
    }
}
