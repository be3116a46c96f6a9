//! Candle rule abstraction and the standard rule catalog.
//!
//! Each rule implements [`CandleRule`]: it inspects the tail of a bar
//! window plus a precomputed [`RuleContext`] and yields a match with a
//! confidence derived from how strongly its geometric thresholds are
//! exceeded. The [`RuleCatalog`] runs every registered rule and picks
//! the strongest match.
//!
//! Rules are deterministic and never error: bad or insufficient input
//! is simply "no match".

pub mod single_bar;
pub mod three_bar;
pub mod two_bar;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::bar::{Bar, Direction};
use super::indicators;

/// Precomputed window context shared by every rule evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleContext {
    /// Direction of the move leading into the latest bar.
    pub trend: Direction,
    pub avg_volume: Decimal,
    pub avg_body: Decimal,
}

/// Bars of history the context averages are computed over.
const CONTEXT_PERIOD: usize = 20;

/// Bars of lookback for the prior-trend read.
const TREND_LOOKBACK: usize = 10;

impl RuleContext {
    /// Build the context from a bar window (oldest to newest).
    ///
    /// The trend is read from the window excluding the final bar so a
    /// reversal candle does not dilute its own precondition.
    #[must_use]
    pub fn from_bars(bars: &[Bar]) -> Option<Self> {
        if bars.len() < CONTEXT_PERIOD + 1 {
            return None;
        }
        let prior = &bars[..bars.len() - 1];
        Some(Self {
            trend: indicators::trend_direction(prior, TREND_LOOKBACK),
            avg_volume: indicators::avg_volume(bars, CONTEXT_PERIOD)?,
            avg_body: indicators::avg_body(bars, CONTEXT_PERIOD)?,
        })
    }
}

/// A single rule's match against the window tail.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub pattern_name: &'static str,
    pub direction: Direction,
    /// Confidence in [0, 1] from threshold exceedance plus context.
    pub confidence: f64,
}

/// A deterministic candle-shape rule.
pub trait CandleRule: Send + Sync {
    /// Unique pattern name, used in detections, dedup keys, and logs.
    fn name(&self) -> &'static str;

    /// Bars of structure the rule inspects at the window tail.
    fn min_bars(&self) -> usize;

    /// Evaluate the rule against the window (oldest to newest).
    fn evaluate(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch>;
}

/// Registry of candle rules.
///
/// Rules are evaluated in registration order; ties on confidence keep
/// the earlier registration.
#[derive(Default)]
pub struct RuleCatalog {
    rules: Vec<Box<dyn CandleRule>>,
}

impl RuleCatalog {
    /// Create a new empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The full standard catalog.
    #[must_use]
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        // Three-bar structures first: when a window completes both a
        // three-bar and a weaker one-bar shape, the richer read wins ties.
        catalog.register(Box::new(three_bar::MorningStar));
        catalog.register(Box::new(three_bar::EveningStar));
        catalog.register(Box::new(three_bar::ThreeWhiteSoldiers));
        catalog.register(Box::new(three_bar::ThreeBlackCrows));
        catalog.register(Box::new(two_bar::BullishEngulfing));
        catalog.register(Box::new(two_bar::BearishEngulfing));
        catalog.register(Box::new(two_bar::BullishHarami));
        catalog.register(Box::new(two_bar::BearishHarami));
        catalog.register(Box::new(two_bar::PiercingLine));
        catalog.register(Box::new(two_bar::DarkCloudCover));
        catalog.register(Box::new(two_bar::TweezerBottom));
        catalog.register(Box::new(two_bar::TweezerTop));
        catalog.register(Box::new(single_bar::Hammer));
        catalog.register(Box::new(single_bar::InvertedHammer));
        catalog.register(Box::new(single_bar::HangingMan));
        catalog.register(Box::new(single_bar::ShootingStar));
        catalog.register(Box::new(single_bar::DragonflyDoji));
        catalog.register(Box::new(single_bar::GravestoneDoji));
        catalog.register(Box::new(single_bar::Doji));
        catalog.register(Box::new(single_bar::BullishMarubozu));
        catalog.register(Box::new(single_bar::BearishMarubozu));
        catalog.register(Box::new(single_bar::SpinningTop));
        catalog
    }

    /// Register a rule.
    pub fn register(&mut self, rule: Box<dyn CandleRule>) {
        self.rules.push(rule);
    }

    /// Get all registered rules.
    #[must_use]
    pub fn rules(&self) -> &[Box<dyn CandleRule>] {
        &self.rules
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule with enough structure and collect the matches.
    #[must_use]
    pub fn evaluate_all(&self, bars: &[Bar], ctx: &RuleContext) -> Vec<RuleMatch> {
        self.rules
            .iter()
            .filter(|rule| bars.len() >= rule.min_bars())
            .filter_map(|rule| rule.evaluate(bars, ctx))
            .collect()
    }

    /// The strongest match across the catalog, if any.
    #[must_use]
    pub fn best_match(&self, bars: &[Bar], ctx: &RuleContext) -> Option<RuleMatch> {
        self.evaluate_all(bars, ctx)
            .into_iter()
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

/// Base-plus-exceedance confidence shaping shared by the rules.
///
/// `exceedance` should already be normalized to [0, 1]; the result is
/// `base + span * exceedance` before context boosts.
pub(crate) fn scaled(base: f64, span: f64, exceedance: f64) -> f64 {
    base + span * exceedance.clamp(0.0, 1.0)
}

/// Confirmation bonus when the pattern bar trades well above average
/// volume. Up to +0.10 at twice the trailing average.
pub(crate) fn volume_boost(bar: &Bar, ctx: &RuleContext) -> f64 {
    if ctx.avg_volume.is_zero() {
        return 0.0;
    }
    let ratio = (bar.volume / ctx.avg_volume).to_f64().unwrap_or(1.0);
    if ratio < 1.2 {
        return 0.0;
    }
    0.05 + 0.05 * ((ratio - 1.2) / 0.8).clamp(0.0, 1.0)
}

/// Bonus when the prior trend matches what the pattern wants to see.
pub(crate) fn trend_boost(wanted: Direction, ctx: &RuleContext) -> f64 {
    if ctx.trend == wanted {
        0.10
    } else {
        0.0
    }
}

/// Ratio of two price distances as f64, `None` when the divisor is zero.
pub(crate) fn price_ratio(numer: Decimal, denom: Decimal) -> Option<f64> {
    if denom.is_zero() {
        return None;
    }
    (numer / denom).to_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn window_with_tail(tail: Vec<Bar>) -> Vec<Bar> {
        let mut bars = test_support::downtrend_window(30);
        bars.extend(tail);
        bars
    }

    #[test]
    fn standard_catalog_has_full_rule_set() {
        let catalog = RuleCatalog::standard();
        assert!(catalog.len() >= 12, "catalog has {} rules", catalog.len());
        assert!(!catalog.is_empty());
    }

    #[test]
    fn rule_names_are_unique() {
        let catalog = RuleCatalog::standard();
        let mut names: Vec<_> = catalog.rules().iter().map(|r| r.name()).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn context_requires_enough_history() {
        let bars = test_support::downtrend_window(5);
        assert!(RuleContext::from_bars(&bars).is_none());
        let bars = test_support::downtrend_window(30);
        assert!(RuleContext::from_bars(&bars).is_some());
    }

    #[test]
    fn context_reads_downtrend() {
        let bars = test_support::downtrend_window(30);
        let ctx = RuleContext::from_bars(&bars).unwrap();
        assert_eq!(ctx.trend, Direction::Bearish);
    }

    #[test]
    fn best_match_returns_highest_confidence() {
        // A strong engulfing pair at the end of a downtrend should beat
        // any weaker single-bar read of the same window.
        let prev = test_support::bar(dec!(100), dec!(101), dec!(97), dec!(98), dec!(100));
        let curr = test_support::bar(dec!(97.5), dec!(103), dec!(97), dec!(102.5), dec!(250));
        let bars = window_with_tail(vec![prev, curr]);
        let ctx = RuleContext::from_bars(&bars).unwrap();

        let catalog = RuleCatalog::standard();
        let best = catalog.best_match(&bars, &ctx).unwrap();
        assert_eq!(best.pattern_name, "bullish_engulfing");
    }

    #[test]
    fn volume_boost_needs_elevated_volume() {
        let bars = test_support::downtrend_window(30);
        let ctx = RuleContext::from_bars(&bars).unwrap();
        let quiet = test_support::bar(dec!(100), dec!(101), dec!(99), dec!(100.5), dec!(100));
        assert_eq!(volume_boost(&quiet, &ctx), 0.0);
        let loud = test_support::bar(dec!(100), dec!(101), dec!(99), dec!(100.5), dec!(300));
        assert!(volume_boost(&loud, &ctx) > 0.05);
    }

    #[test]
    fn empty_catalog_matches_nothing() {
        let bars = test_support::downtrend_window(30);
        let ctx = RuleContext::from_bars(&bars).unwrap();
        let catalog = RuleCatalog::new();
        assert!(catalog.best_match(&bars, &ctx).is_none());
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared bar builders for rule tests.

    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::domain::bar::Bar;
    use crate::domain::id::Symbol;
    use crate::domain::Timeframe;

    /// One H1 bar with fixed symbol and a timestamp far in the past.
    pub fn bar(open: Decimal, high: Decimal, low: Decimal, close: Decimal, volume: Decimal) -> Bar {
        Bar {
            symbol: Symbol::new("BTC-USD"),
            timeframe: Timeframe::H1,
            open,
            high,
            low,
            close,
            volume,
            timestamp: Utc::now(),
        }
    }

    /// `n` bars drifting steadily down from 130, average volume ~100.
    pub fn downtrend_window(n: usize) -> Vec<Bar> {
        let start = Utc::now() - Duration::hours(n as i64 + 8);
        (0..n)
            .map(|i| {
                let close = dec!(130) - Decimal::from(i);
                Bar {
                    symbol: Symbol::new("BTC-USD"),
                    timeframe: Timeframe::H1,
                    open: close + dec!(1),
                    high: close + dec!(1.5),
                    low: close - dec!(0.5),
                    close,
                    volume: dec!(100),
                    timestamp: start + Duration::hours(i as i64),
                }
            })
            .collect()
    }

    /// `n` bars drifting steadily up from 100, average volume ~100.
    pub fn uptrend_window(n: usize) -> Vec<Bar> {
        let start = Utc::now() - Duration::hours(n as i64 + 8);
        (0..n)
            .map(|i| {
                let close = dec!(100) + Decimal::from(i);
                Bar {
                    symbol: Symbol::new("BTC-USD"),
                    timeframe: Timeframe::H1,
                    open: close - dec!(1),
                    high: close + dec!(0.5),
                    low: close - dec!(1.5),
                    close,
                    volume: dec!(100),
                    timestamp: start + Duration::hours(i as i64),
                }
            })
            .collect()
    }

    /// Flat, directionless window around 100.
    pub fn flat_window(n: usize) -> Vec<Bar> {
        let start = Utc::now() - Duration::hours(n as i64 + 8);
        (0..n)
            .map(|i| {
                let wiggle = if i % 2 == 0 { dec!(0.2) } else { dec!(-0.2) };
                let close = dec!(100) + wiggle;
                Bar {
                    symbol: Symbol::new("BTC-USD"),
                    timeframe: Timeframe::H1,
                    open: dec!(100) - wiggle,
                    high: close + dec!(0.6),
                    low: dec!(100) - dec!(0.8),
                    close,
                    volume: dec!(100),
                    timestamp: start + Duration::hours(i as i64),
                }
            })
            .collect()
    }
}
