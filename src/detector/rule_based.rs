//! Rule-based candle pattern detector.

use std::cmp::Ordering;

use crate::domain::indicators;
use crate::domain::rules::{RuleCatalog, RuleContext};
use crate::domain::{Bar, Direction};

use super::MIN_WINDOW;

/// The strongest rule match over a window, with catalog context.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBasedDetection {
    pub pattern_name: &'static str,
    pub direction: Direction,
    pub raw_confidence: f64,
    /// How many catalog rules matched this window.
    pub rules_passed: usize,
    pub total_rules: usize,
}

/// Evaluates the rule catalog over recent bars and keeps the strongest
/// match. Insufficient or degenerate input is "no detection", never an
/// error.
pub struct RuleBasedDetector {
    catalog: RuleCatalog,
    min_bars: usize,
}

impl RuleBasedDetector {
    #[must_use]
    pub fn new(catalog: RuleCatalog, min_bars: usize) -> Self {
        Self { catalog, min_bars }
    }

    /// Detector over the standard catalog with the default window floor.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(RuleCatalog::standard(), MIN_WINDOW)
    }

    /// Strongest pattern match over the window, if any.
    #[must_use]
    pub fn detect(&self, bars: &[Bar]) -> Option<RuleBasedDetection> {
        if bars.len() < self.min_bars {
            return None;
        }
        let ctx = RuleContext::from_bars(bars)?;
        let matches = self.catalog.evaluate_all(bars, &ctx);
        let rules_passed = matches.len();
        let best = matches.into_iter().max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(Ordering::Equal)
        })?;
        Some(RuleBasedDetection {
            pattern_name: best.pattern_name,
            direction: best.direction,
            raw_confidence: best.confidence.clamp(0.0, 1.0),
            rules_passed,
            total_rules: self.catalog.len(),
        })
    }

    /// Signed directional lean of the window in [-1, 1].
    ///
    /// Pattern matches lean by their confidence; windows without a
    /// match fall back to a modest trend read. Used to build the
    /// per-timeframe scores for cross-timeframe agreement.
    #[must_use]
    pub fn directional_score(&self, bars: &[Bar]) -> f64 {
        if let Some(detection) = self.detect(bars) {
            return match detection.direction {
                Direction::Bullish => detection.raw_confidence,
                Direction::Bearish => -detection.raw_confidence,
                Direction::Neutral => 0.0,
            };
        }
        match indicators::trend_direction(bars, indicators::REGIME_LOOKBACK) {
            Direction::Bullish => 0.3,
            Direction::Bearish => -0.3,
            Direction::Neutral => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::test_support::{bar, downtrend_window, uptrend_window};
    use rust_decimal_macros::dec;

    fn engulfing_window() -> Vec<Bar> {
        let mut bars = downtrend_window(55);
        // Downtrend ends at close 76; a bearish bar then a wide bullish
        // engulfing bar on heavy volume.
        bars.push(bar(dec!(76), dec!(77), dec!(73.5), dec!(74), dec!(100)));
        bars.push(bar(dec!(73.8), dec!(79), dec!(73.5), dec!(78.5), dec!(250)));
        bars
    }

    #[test]
    fn detect_finds_the_engulfing_pattern() {
        let detector = RuleBasedDetector::standard();
        let detection = detector.detect(&engulfing_window()).unwrap();
        assert_eq!(detection.pattern_name, "bullish_engulfing");
        assert_eq!(detection.direction, Direction::Bullish);
        assert!(detection.raw_confidence > 0.75);
        assert!(detection.rules_passed >= 1);
        assert_eq!(detection.total_rules, 22);
    }

    #[test]
    fn detect_requires_minimum_history() {
        let detector = RuleBasedDetector::standard();
        assert!(detector.detect(&downtrend_window(30)).is_none());
    }

    #[test]
    fn quiet_window_has_no_detection() {
        let detector = RuleBasedDetector::standard();
        // A clean downtrend tail matches no reversal or continuation rule.
        assert!(detector.detect(&downtrend_window(60)).is_none());
    }

    #[test]
    fn directional_score_signs_follow_the_pattern() {
        let detector = RuleBasedDetector::standard();
        let lean = detector.directional_score(&engulfing_window());
        assert!(lean > 0.75);
    }

    #[test]
    fn directional_score_falls_back_to_trend() {
        let detector = RuleBasedDetector::standard();
        assert!((detector.directional_score(&downtrend_window(60)) - (-0.3)).abs() < f64::EPSILON);
        assert!((detector.directional_score(&uptrend_window(60)) - 0.3).abs() < f64::EPSILON);
    }
}
