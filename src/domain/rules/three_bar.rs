//! Three-candle rules.

use rust_decimal::Decimal;

use crate::domain::bar::{Bar, CandleExt, Direction};

use super::{price_ratio, scaled, trend_boost, volume_boost, CandleRule, RuleContext, RuleMatch};

fn last_three(bars: &[Bar]) -> Option<(&Bar, &Bar, &Bar)> {
    if bars.len() < 3 {
        return None;
    }
    Some((
        &bars[bars.len() - 3],
        &bars[bars.len() - 2],
        &bars[bars.len() - 1],
    ))
}

fn body_mid(bar: &Bar) -> Decimal {
    (bar.open + bar.close) / Decimal::TWO
}

/// Morning star: a real down bar, a small star, then a bullish bar
/// reclaiming past the midpoint of the first body.
pub struct MorningStar;

impl CandleRule for MorningStar {
    fn name(&self) -> &'static str {
        "morning_star"
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let (b1, b2, b3) = last_three(bars)?;
        if !b1.is_bearish() || b1.body() < ctx.avg_body {
            return None;
        }
        if b2.body() * Decimal::TWO > b1.body() {
            return None;
        }
        let mid = body_mid(b1);
        if !b3.is_bullish() || b3.close <= mid {
            return None;
        }
        let penetration = price_ratio(b3.close - mid, b1.open - mid)?.clamp(0.0, 1.0);
        let confidence = (scaled(0.55, 0.15, penetration)
            + trend_boost(Direction::Bearish, ctx)
            + volume_boost(b3, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bullish,
            confidence,
        })
    }
}

/// Evening star: mirror of the morning star at the top of a rise.
pub struct EveningStar;

impl CandleRule for EveningStar {
    fn name(&self) -> &'static str {
        "evening_star"
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let (b1, b2, b3) = last_three(bars)?;
        if !b1.is_bullish() || b1.body() < ctx.avg_body {
            return None;
        }
        if b2.body() * Decimal::TWO > b1.body() {
            return None;
        }
        let mid = body_mid(b1);
        if !b3.is_bearish() || b3.close >= mid {
            return None;
        }
        let penetration = price_ratio(mid - b3.close, mid - b1.open)?.clamp(0.0, 1.0);
        let confidence = (scaled(0.55, 0.15, penetration)
            + trend_boost(Direction::Bullish, ctx)
            + volume_boost(b3, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bearish,
            confidence,
        })
    }
}

/// Mean of the three bars' body-to-range ratios, shaped into [0, 1]
/// above a 0.5 floor.
fn soldier_strength(b1: &Bar, b2: &Bar, b3: &Bar) -> f64 {
    let mean = (b1.body_ratio() + b2.body_ratio() + b3.body_ratio()) / 3.0;
    ((mean - 0.5) / 0.4).clamp(0.0, 1.0)
}

/// Three white soldiers: three long bullish bars, each opening inside
/// the prior body and closing at a new high. Long means longer than
/// the window's typical body, so a monotone grind does not qualify.
pub struct ThreeWhiteSoldiers;

impl CandleRule for ThreeWhiteSoldiers {
    fn name(&self) -> &'static str {
        "three_white_soldiers"
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let (b1, b2, b3) = last_three(bars)?;
        let min_body = ctx.avg_body * Decimal::new(12, 1);
        for bar in [b1, b2, b3] {
            if !bar.is_bullish() || bar.body() < min_body || bar.upper_shadow_ratio() > 0.35 {
                return None;
            }
        }
        for (prev, curr) in [(b1, b2), (b2, b3)] {
            if curr.close <= prev.close || curr.open < prev.open || curr.open > prev.close {
                return None;
            }
        }
        let confidence = (scaled(0.60, 0.15, soldier_strength(b1, b2, b3))
            + trend_boost(Direction::Bearish, ctx)
            + volume_boost(b3, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bullish,
            confidence,
        })
    }
}

/// Three black crows: three long bearish bars stepping down.
pub struct ThreeBlackCrows;

impl CandleRule for ThreeBlackCrows {
    fn name(&self) -> &'static str {
        "three_black_crows"
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        let (b1, b2, b3) = last_three(bars)?;
        let min_body = ctx.avg_body * Decimal::new(12, 1);
        for bar in [b1, b2, b3] {
            if !bar.is_bearish() || bar.body() < min_body || bar.lower_shadow_ratio() > 0.35 {
                return None;
            }
        }
        for (prev, curr) in [(b1, b2), (b2, b3)] {
            if curr.close >= prev.close || curr.open > prev.open || curr.open < prev.close {
                return None;
            }
        }
        let confidence = (scaled(0.60, 0.15, soldier_strength(b1, b2, b3))
            + trend_boost(Direction::Bullish, ctx)
            + volume_boost(b3, ctx))
        .clamp(0.0, 1.0);
        Some(RuleMatch {
            pattern_name: self.name(),
            direction: Direction::Bearish,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::test_support::{bar, downtrend_window, uptrend_window};
    use rust_decimal_macros::dec;

    fn eval(rule: &dyn CandleRule, mut window: Vec<Bar>, triple: [Bar; 3]) -> Option<RuleMatch> {
        window.extend(triple);
        let ctx = RuleContext::from_bars(&window).unwrap();
        rule.evaluate(&window, &ctx)
    }

    #[test]
    fn morning_star_after_downtrend() {
        let b1 = bar(dec!(103), dec!(103.5), dec!(100.5), dec!(101), dec!(100));
        let b2 = bar(dec!(100.5), dec!(101), dec!(99.8), dec!(100.2), dec!(100));
        let b3 = bar(dec!(100.4), dec!(103.4), dec!(100.2), dec!(102.9), dec!(220));
        let m = eval(&MorningStar, downtrend_window(30), [b1, b2, b3]).unwrap();
        assert_eq!(m.direction, Direction::Bullish);
        assert!(m.confidence > 0.75, "confidence {}", m.confidence);
    }

    #[test]
    fn morning_star_needs_a_small_star() {
        let b1 = bar(dec!(103), dec!(103.5), dec!(100.5), dec!(101), dec!(100));
        let b2 = bar(dec!(100.8), dec!(101), dec!(98.9), dec!(99.3), dec!(100));
        let b3 = bar(dec!(100.4), dec!(103.4), dec!(100.2), dec!(102.9), dec!(220));
        assert!(eval(&MorningStar, downtrend_window(30), [b1, b2, b3]).is_none());
    }

    #[test]
    fn evening_star_after_uptrend() {
        let b1 = bar(dec!(127.5), dec!(131.2), dec!(127.3), dec!(131), dec!(100));
        let b2 = bar(dec!(131.3), dec!(132), dec!(131), dec!(131.6), dec!(100));
        let b3 = bar(dec!(131.4), dec!(131.6), dec!(127.9), dec!(128.2), dec!(220));
        let m = eval(&EveningStar, uptrend_window(30), [b1, b2, b3]).unwrap();
        assert_eq!(m.direction, Direction::Bearish);
        assert!(m.confidence > 0.7);
    }

    #[test]
    fn three_white_soldiers_step_upward() {
        let b1 = bar(dec!(101), dec!(103.2), dec!(100.8), dec!(103), dec!(100));
        let b2 = bar(dec!(102.5), dec!(105.2), dec!(102.3), dec!(105), dec!(100));
        let b3 = bar(dec!(104.5), dec!(107.3), dec!(104.3), dec!(107), dec!(200));
        let m = eval(&ThreeWhiteSoldiers, downtrend_window(30), [b1, b2, b3]).unwrap();
        assert_eq!(m.direction, Direction::Bullish);
        assert!(m.confidence > 0.8, "confidence {}", m.confidence);
    }

    #[test]
    fn soldiers_reject_overlapping_closes() {
        let b1 = bar(dec!(101), dec!(103.2), dec!(100.8), dec!(103), dec!(100));
        let b2 = bar(dec!(102.5), dec!(105.2), dec!(102.3), dec!(105), dec!(100));
        let b3 = bar(dec!(104.5), dec!(105.1), dec!(103.9), dec!(104.8), dec!(200));
        assert!(eval(&ThreeWhiteSoldiers, downtrend_window(30), [b1, b2, b3]).is_none());
    }

    #[test]
    fn three_black_crows_step_downward() {
        let b1 = bar(dec!(129), dec!(129.4), dec!(126.6), dec!(127), dec!(100));
        let b2 = bar(dec!(128), dec!(128.3), dec!(124.7), dec!(125), dec!(100));
        let b3 = bar(dec!(126), dec!(126.4), dec!(122.8), dec!(123), dec!(200));
        let m = eval(&ThreeBlackCrows, uptrend_window(30), [b1, b2, b3]).unwrap();
        assert_eq!(m.direction, Direction::Bearish);
        assert!(m.confidence > 0.75, "confidence {}", m.confidence);
    }
}
