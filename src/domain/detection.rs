//! Pattern detection records produced by the confidence engine.
//!
//! A `PatternDetection` is the externally consumed signal: component
//! scores, the fused confidence, risk parameters, and per-layer
//! explanations. Layer weights are deliberately absent from this type;
//! only what was measured is exposed, never how it was combined.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bar::{Direction, Timeframe};
use super::id::{DetectionId, OutcomeId, Symbol};

/// Discretized confidence bucket, inclusive at the lower edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityTier {
    Weak,
    Moderate,
    Good,
    High,
    Elite,
}

impl QualityTier {
    /// Bucket a composite confidence.
    ///
    /// A score of exactly 0.85 is `Elite`; 0.849999 is `High`.
    #[must_use]
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.85 {
            QualityTier::Elite
        } else if confidence >= 0.75 {
            QualityTier::High
        } else if confidence >= 0.65 {
            QualityTier::Good
        } else if confidence >= 0.50 {
            QualityTier::Moderate
        } else {
            QualityTier::Weak
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QualityTier::Elite => "ELITE",
            QualityTier::High => "HIGH",
            QualityTier::Good => "GOOD",
            QualityTier::Moderate => "MODERATE",
            QualityTier::Weak => "WEAK",
        };
        write!(f, "{s}")
    }
}

/// Named weight-vector policy governing fusion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionMode {
    #[default]
    Conservative,
    Aggressive,
}

impl fmt::Display for FusionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FusionMode::Conservative => "conservative",
            FusionMode::Aggressive => "aggressive",
        };
        write!(f, "{s}")
    }
}

impl FromStr for FusionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conservative" => Ok(FusionMode::Conservative),
            "aggressive" => Ok(FusionMode::Aggressive),
            other => Err(format!("unknown fusion mode: {other}")),
        }
    }
}

/// The fusion layers contributing to a composite confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Learned,
    RuleBased,
    Sentiment,
    Context,
    History,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Layer::Learned => "learned",
            Layer::RuleBased => "rule_based",
            Layer::Sentiment => "sentiment",
            Layer::Context => "context",
            Layer::History => "history",
        };
        write!(f, "{s}")
    }
}

/// One per-layer natural-language statement in a detection explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerExplanation {
    pub layer: Layer,
    /// The layer's component score in [0, 1], after any rescaling.
    pub score: f64,
    pub summary: String,
}

/// A fused trading signal. Immutable after creation except for the
/// later-attached outcome reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDetection {
    pub id: DetectionId,
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub pattern_name: String,
    pub direction: Direction,
    /// Raw per-layer scores in [0, 1], keyed by layer.
    pub detector_scores: BTreeMap<Layer, f64>,
    pub composite_confidence: f64,
    pub quality_tier: QualityTier,
    pub mode: FusionMode,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub risk_reward_ratio: f64,
    /// Set when the achieved risk/reward falls below the configured
    /// minimum. Flagged, not discarded.
    pub low_priority: bool,
    /// Ordered per-layer statements, strongest layer first.
    pub explanation: Vec<LayerExplanation>,
    /// Structured measurement map (volume_score, momentum_score, ...).
    pub quality_factors: BTreeMap<String, f64>,
    /// Feature vector captured at detection time, used later as a
    /// training sample once the outcome is labeled.
    pub feature_snapshot: Vec<f64>,
    pub created_at: DateTime<Utc>,
    pub outcome_id: Option<OutcomeId>,
}

impl PatternDetection {
    /// Price distance between entry and stop.
    #[must_use]
    pub fn stop_distance(&self) -> Decimal {
        (self.entry_price - self.stop_loss).abs()
    }
}
