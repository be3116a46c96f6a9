//! Multi-timeframe fusion.
//!
//! Each timeframe contributes an agreement score in `[0, 1]` for the
//! candidate direction (1.0 fully agrees, 0.0 fully opposes). Fusion
//! weighs the scores by regime, measures how much the timeframes agree
//! with each other, and flags divergence so callers can surface it.

use tracing::debug;

use crate::domain::indicators::{variance, Regime};
use crate::domain::Timeframe;
use crate::fusion::redistribute;

/// Agreement of one timeframe with the candidate direction, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeframeScore {
    pub timeframe: Timeframe,
    pub score: f64,
}

impl TimeframeScore {
    #[must_use]
    pub fn new(timeframe: Timeframe, score: f64) -> Self {
        Self { timeframe, score }
    }
}

/// Result of fusing per-timeframe agreement into one context score.
///
/// `weights_used` records the renormalized weight each present
/// timeframe actually received. It stays internal to the pipeline and
/// is never serialized into a detection.
#[derive(Debug, Clone)]
pub struct ContextScore {
    pub score: f64,
    pub alignment: f64,
    pub weights_used: Vec<(Timeframe, f64)>,
    pub divergence: bool,
    pub regime: Regime,
}

/// Fuses per-timeframe agreement scores under regime-dependent weights.
///
/// The configured timeframes are held shortest to longest, and both
/// weight tables are aligned with that order. When a timeframe is
/// missing its weight is redistributed proportionally across the
/// present ones rather than silently treated as zero agreement.
#[derive(Debug, Clone)]
pub struct TimeframeFusion {
    timeframes: Vec<Timeframe>,
    trending: Vec<f64>,
    ranging: Vec<f64>,
    divergence_threshold: f64,
}

/// Maximum possible variance of scores bounded to `[0, 1]`.
const MAX_SCORE_VARIANCE: f64 = 0.25;

impl TimeframeFusion {
    /// Weight tables are index-aligned with `timeframes`; callers
    /// validate that lengths match and each table sums to 1.
    #[must_use]
    pub fn new(
        timeframes: Vec<Timeframe>,
        trending: Vec<f64>,
        ranging: Vec<f64>,
        divergence_threshold: f64,
    ) -> Self {
        Self {
            timeframes,
            trending,
            ranging,
            divergence_threshold,
        }
    }

    #[must_use]
    pub fn timeframes(&self) -> &[Timeframe] {
        &self.timeframes
    }

    /// Longest configured timeframe, the one regime detection reads.
    #[must_use]
    pub fn regime_timeframe(&self) -> Option<Timeframe> {
        self.timeframes.iter().copied().max()
    }

    /// Fuse the per-timeframe scores under the given regime.
    ///
    /// Returns `None` when no configured timeframe reported a score.
    /// Scores for unconfigured timeframes are ignored. Divergence is
    /// flagged on the result, never used to drop it.
    #[must_use]
    pub fn fuse(&self, per_tf: &[TimeframeScore], regime: Regime) -> Option<ContextScore> {
        if per_tf.is_empty() {
            return None;
        }
        for unknown in per_tf
            .iter()
            .filter(|s| !self.timeframes.contains(&s.timeframe))
        {
            debug!(
                timeframe = unknown.timeframe.as_str(),
                "Ignoring score for an unconfigured timeframe"
            );
        }

        let base = match regime {
            Regime::Trending(_) => &self.trending,
            Regime::Ranging => &self.ranging,
        };
        let available: Vec<bool> = self
            .timeframes
            .iter()
            .map(|tf| per_tf.iter().any(|s| s.timeframe == *tf))
            .collect();
        let weights = redistribute(base, &available)?;

        let mut score = 0.0;
        let mut weights_used = Vec::new();
        let mut values = Vec::new();
        for (i, tf) in self.timeframes.iter().enumerate() {
            let Some(reported) = per_tf.iter().find(|s| s.timeframe == *tf) else {
                continue;
            };
            let clamped = reported.score.clamp(0.0, 1.0);
            score += weights[i] * clamped;
            weights_used.push((*tf, weights[i]));
            values.push(clamped);
        }
        if weights_used.is_empty() {
            return None;
        }

        let alignment = (1.0 - variance(&values) / MAX_SCORE_VARIANCE).clamp(0.0, 1.0);
        let divergence = alignment < self.divergence_threshold;
        Some(ContextScore {
            score: score.clamp(0.0, 1.0),
            alignment,
            weights_used,
            divergence,
            regime,
        })
    }
}
