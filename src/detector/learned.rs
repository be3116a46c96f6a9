//! Learned detection layer backed by the model registry.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{Bar, ModelNamespace};
use crate::learning::ModelRegistry;

use super::features::FeatureVector;

/// Score produced by the learned layer.
#[derive(Debug, Clone)]
pub struct LearnedScore {
    /// Predicted win probability in [0, 1].
    pub raw_confidence: f64,
    /// Which namespace's model produced the score.
    pub namespace: ModelNamespace,
}

/// Scores windows through the active logistic models.
///
/// Reads are lock-free snapshots; a promotion landing mid-scan does not
/// affect scores already in flight.
pub struct LearnedDetector {
    registry: Arc<ModelRegistry>,
}

impl LearnedDetector {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Score the window's final bar for the given pattern.
    ///
    /// Prefers the pattern's own model and falls back to the global
    /// namespace. `None` when no model is active, the window is too
    /// short for feature extraction, or the active model was trained
    /// on a different feature width.
    #[must_use]
    pub fn score(&self, bars: &[Bar], pattern_name: &str) -> Option<LearnedScore> {
        let features = FeatureVector::extract(bars)?;
        let model = self
            .registry
            .active(&ModelNamespace::Pattern(pattern_name.to_string()))
            .or_else(|| self.registry.active(&ModelNamespace::Global))?;

        let Some(raw_confidence) = model.predict(features.values()) else {
            debug!(
                namespace = %model.namespace,
                model_width = model.feature_count,
                "active model predates the current feature set"
            );
            return None;
        };
        Some(LearnedScore {
            raw_confidence,
            namespace: model.namespace.clone(),
        })
    }

    /// Whether any model is active at all.
    #[must_use]
    pub fn has_models(&self) -> bool {
        !self.registry.is_empty()
    }
}
