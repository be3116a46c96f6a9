//! Composite confidence engine.
//!
//! Blends the per-layer scores into one confidence value under the
//! active fusion mode, frames entry, stop, and target around the
//! detected bar, and assembles the explanation a detection ships with.
//! Weight tables stay inside the engine; detections expose measured
//! scores and prose, never the blend arithmetic.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::detector::{FeatureVector, LearnedScore, RuleBasedDetection};
use crate::domain::indicators::{atr, avg_volume, rate_of_change, swing_high, swing_low};
use crate::domain::{
    Bar, DetectionId, Direction, FusionMode, Layer, LayerExplanation, PatternDetection,
    QualityTier, SentimentSnapshot, Symbol, Timeframe,
};
use crate::fusion::{redistribute, ContextScore};

const ATR_PERIOD: usize = 14;
const SWING_LOOKBACK: usize = 20;
const VOLUME_PERIOD: usize = 20;
/// Volume at this multiple of average saturates the volume factor.
const VOLUME_SATURATION: f64 = 3.0;
const MOMENTUM_LOOKBACK: usize = 10;
/// Close-to-close change that saturates the momentum factor.
const MOMENTUM_SPAN: f64 = 0.1;

/// Per-layer blend weights for one fusion mode.
///
/// Ordered as the [`Layer`] enum: learned, rule, sentiment, context,
/// history. A zero weight keeps the layer measured but uncounted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeWeights {
    pub learned: f64,
    pub rule: f64,
    pub sentiment: f64,
    pub context: f64,
    pub history: f64,
}

impl ModeWeights {
    /// Default conservative blend. History stays measured but unweighted.
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            learned: 0.35,
            rule: 0.35,
            sentiment: 0.15,
            context: 0.15,
            history: 0.0,
        }
    }

    /// Default aggressive blend, including the history layer.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            learned: 0.30,
            rule: 0.25,
            sentiment: 0.20,
            context: 0.15,
            history: 0.10,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.learned,
            self.rule,
            self.sentiment,
            self.context,
            self.history,
        ]
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Whether the weights form a distribution, within float tolerance.
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= 1e-6
    }
}

/// Construction-time knobs for the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub conservative: ModeWeights,
    pub aggressive: ModeWeights,
    pub atr_multiplier: Decimal,
    pub min_risk_reward: Decimal,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            conservative: ModeWeights::conservative(),
            aggressive: ModeWeights::aggressive(),
            atr_multiplier: dec!(1.5),
            min_risk_reward: dec!(2.0),
        }
    }
}

/// Everything the layers reported for one candidate window.
///
/// The rule layer is mandatory; without a matched pattern there is
/// nothing to compose. Every other layer may be absent, and its weight
/// is then redistributed across the layers that did report.
#[derive(Debug, Clone)]
pub struct LayerInputs {
    pub rule: RuleBasedDetection,
    pub learned: Option<LearnedScore>,
    pub sentiment: Option<SentimentSnapshot>,
    pub context: Option<ContextScore>,
    pub history_win_rate: Option<f64>,
}

/// Composes layer scores into a [`PatternDetection`].
#[derive(Debug, Clone)]
pub struct ConfidenceEngine {
    settings: EngineSettings,
}

impl ConfidenceEngine {
    #[must_use]
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    /// Blend the reported layers and frame the trade around the last
    /// bar.
    ///
    /// `None` when the window is too short to measure volatility or the
    /// volatility is zero; a risk frame cannot be drawn either way.
    #[must_use]
    pub fn compose(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        bars: &[Bar],
        mode: FusionMode,
        inputs: LayerInputs,
    ) -> Option<PatternDetection> {
        let last = bars.last()?;
        let entry = last.close;
        let stop_distance = atr(bars, ATR_PERIOD)? * self.settings.atr_multiplier;
        if stop_distance <= Decimal::ZERO {
            return None;
        }

        let direction = inputs.rule.direction;
        let (stop_loss, take_profit) = self.risk_frame(bars, entry, stop_distance, direction);
        let reward = (take_profit - entry).abs();
        let risk_reward_ratio = (reward / stop_distance).to_f64().unwrap_or(0.0);
        let low_priority = reward < stop_distance * self.settings.min_risk_reward;

        let layer_scores = [
            inputs
                .learned
                .as_ref()
                .map(|l| l.raw_confidence.clamp(0.0, 1.0)),
            Some(inputs.rule.raw_confidence.clamp(0.0, 1.0)),
            inputs
                .sentiment
                .as_ref()
                .map(|s| ((s.overall_score + 1.0) / 2.0).clamp(0.0, 1.0)),
            inputs.context.as_ref().map(|c| c.score.clamp(0.0, 1.0)),
            inputs.history_win_rate.map(|w| w.clamp(0.0, 1.0)),
        ];
        let available: Vec<bool> = layer_scores.iter().map(Option::is_some).collect();
        let table = match mode {
            FusionMode::Conservative => self.settings.conservative,
            FusionMode::Aggressive => self.settings.aggressive,
        };
        let weights = redistribute(&table.as_array(), &available)?;
        let composite: f64 = weights
            .iter()
            .zip(layer_scores)
            .filter_map(|(w, s)| s.map(|s| w * s))
            .sum();
        let composite = composite.clamp(0.0, 1.0);

        let mut detector_scores = BTreeMap::new();
        let layers = [
            Layer::Learned,
            Layer::RuleBased,
            Layer::Sentiment,
            Layer::Context,
            Layer::History,
        ];
        for (layer, score) in layers.iter().zip(layer_scores) {
            if let Some(score) = score {
                detector_scores.insert(*layer, score);
            }
        }

        let mut explanation = explain(&inputs, &detector_scores);
        explanation.sort_by(|a, b| b.score.total_cmp(&a.score));

        Some(PatternDetection {
            id: DetectionId::new(),
            symbol: symbol.clone(),
            timeframe,
            pattern_name: inputs.rule.pattern_name.to_string(),
            direction,
            detector_scores,
            composite_confidence: composite,
            quality_tier: QualityTier::from_confidence(composite),
            mode,
            entry_price: entry,
            stop_loss,
            take_profit,
            risk_reward_ratio,
            low_priority,
            explanation,
            quality_factors: quality_factors(bars, &inputs),
            feature_snapshot: FeatureVector::extract(bars)
                .map(FeatureVector::into_values)
                .unwrap_or_default(),
            created_at: Utc::now(),
            outcome_id: None,
        })
    }

    /// Stop sits one measured move against the signal; the target sits
    /// `min_risk_reward` moves with it, but never past a swing level
    /// standing between entry and the measured move.
    fn risk_frame(
        &self,
        bars: &[Bar],
        entry: Decimal,
        stop_distance: Decimal,
        direction: Direction,
    ) -> (Decimal, Decimal) {
        let reach = stop_distance * self.settings.min_risk_reward;
        match direction {
            Direction::Bullish => {
                let ideal = entry + reach;
                let target = match swing_high(bars, SWING_LOOKBACK) {
                    Some(cap) if cap > entry => ideal.min(cap),
                    _ => ideal,
                };
                (entry - stop_distance, target)
            }
            Direction::Bearish => {
                let ideal = entry - reach;
                let target = match swing_low(bars, SWING_LOOKBACK) {
                    Some(cap) if cap < entry => ideal.max(cap),
                    _ => ideal,
                };
                (entry + stop_distance, target)
            }
            // No directional edge to lean on, so the frame is symmetric.
            Direction::Neutral => (entry - stop_distance, entry + stop_distance),
        }
    }
}

fn explain(
    inputs: &LayerInputs,
    detector_scores: &BTreeMap<Layer, f64>,
) -> Vec<LayerExplanation> {
    let mut out = Vec::with_capacity(detector_scores.len());
    for (&layer, &score) in detector_scores {
        let summary = match layer {
            Layer::Learned => {
                let Some(learned) = inputs.learned.as_ref() else {
                    continue;
                };
                format!(
                    "learned model ({}) puts the win probability at {:.2}",
                    learned.namespace, learned.raw_confidence
                )
            }
            Layer::RuleBased => format!(
                "{} matched with {} of {} rule checks passing",
                inputs.rule.pattern_name, inputs.rule.rules_passed, inputs.rule.total_rules
            ),
            Layer::Sentiment => {
                let Some(snapshot) = inputs.sentiment.as_ref() else {
                    continue;
                };
                format!(
                    "aggregate sentiment is {:+.2} across {} sources",
                    snapshot.overall_score,
                    snapshot.available_sources()
                )
            }
            Layer::Context => {
                let Some(ctx) = inputs.context.as_ref() else {
                    continue;
                };
                if ctx.divergence {
                    format!(
                        "timeframes diverge (alignment {:.2}) in a {} market",
                        ctx.alignment,
                        ctx.regime.as_str()
                    )
                } else {
                    format!(
                        "timeframes align at {:.2} in a {} market",
                        ctx.alignment,
                        ctx.regime.as_str()
                    )
                }
            }
            Layer::History => {
                let Some(rate) = inputs.history_win_rate else {
                    continue;
                };
                format!("pattern closed {:.0}% of recent signals as wins", rate * 100.0)
            }
        };
        out.push(LayerExplanation {
            layer,
            score,
            summary,
        });
    }
    out
}

fn quality_factors(bars: &[Bar], inputs: &LayerInputs) -> BTreeMap<String, f64> {
    let mut factors = BTreeMap::new();
    factors.insert(
        "rules_passed".to_string(),
        inputs.rule.rules_passed as f64,
    );
    let volume_score = bars.last().and_then(|last| {
        avg_volume(bars, VOLUME_PERIOD)
            .filter(|avg| *avg > Decimal::ZERO)
            .and_then(|avg| (last.volume / avg).to_f64())
            .map(|ratio| (ratio / VOLUME_SATURATION).clamp(0.0, 1.0))
    });
    if let Some(volume_score) = volume_score {
        factors.insert("volume_score".to_string(), volume_score);
    }
    if let Some(roc) = rate_of_change(bars, MOMENTUM_LOOKBACK) {
        let momentum = ((roc / MOMENTUM_SPAN).clamp(-1.0, 1.0) + 1.0) / 2.0;
        factors.insert("momentum_score".to_string(), momentum);
    }
    if let Some(ctx) = inputs.context.as_ref() {
        factors.insert("alignment".to_string(), ctx.alignment);
    }
    factors
}
