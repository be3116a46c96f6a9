//! Trained model versions and their namespaces.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::VersionId;

/// Scope a trained model applies to.
///
/// Pattern-specific models take precedence over the global fallback
/// when scoring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "pattern", rename_all = "lowercase")]
pub enum ModelNamespace {
    Global,
    Pattern(String),
}

impl fmt::Display for ModelNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelNamespace::Global => write!(f, "global"),
            ModelNamespace::Pattern(name) => write!(f, "pattern:{name}"),
        }
    }
}

/// One trained logistic scoring model.
///
/// At most one version per namespace is active at a time; promotion
/// deactivates the previous version and activates the new one as a
/// single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub namespace: ModelNamespace,
    pub version_id: VersionId,
    pub trained_at: DateTime<Utc>,
    /// Holdout AUC measured at training time.
    pub metric: f64,
    pub weights: Vec<f64>,
    pub bias: f64,
    pub feature_count: usize,
    pub is_active: bool,
}

impl ModelVersion {
    /// Score a feature vector through this model.
    ///
    /// Returns `None` on a width mismatch instead of scoring garbage.
    #[must_use]
    pub fn predict(&self, features: &[f64]) -> Option<f64> {
        if features.len() != self.weights.len() {
            return None;
        }
        let z: f64 = self.bias
            + self
                .weights
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        Some(sigmoid(z))
    }
}

/// Standard logistic function.
#[must_use]
pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(weights: Vec<f64>, bias: f64) -> ModelVersion {
        let feature_count = weights.len();
        ModelVersion {
            namespace: ModelNamespace::Global,
            version_id: VersionId::new(),
            trained_at: Utc::now(),
            metric: 0.7,
            weights,
            bias,
            feature_count,
            is_active: true,
        }
    }

    #[test]
    fn namespace_display() {
        assert_eq!(ModelNamespace::Global.to_string(), "global");
        assert_eq!(
            ModelNamespace::Pattern("hammer".into()).to_string(),
            "pattern:hammer"
        );
    }

    #[test]
    fn sigmoid_is_centered_and_bounded() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(20.0) > 0.999);
        assert!(sigmoid(-20.0) < 0.001);
    }

    #[test]
    fn predict_applies_weights_and_bias() {
        let model = version(vec![1.0, -1.0], 0.0);
        let score = model.predict(&[2.0, 1.0]).unwrap();
        assert!((score - sigmoid(1.0)).abs() < 1e-12);
    }

    #[test]
    fn predict_rejects_width_mismatch() {
        let model = version(vec![1.0, -1.0], 0.0);
        assert!(model.predict(&[1.0]).is_none());
    }

    #[test]
    fn namespace_round_trips_through_serde() {
        let ns = ModelNamespace::Pattern("bullish_engulfing".into());
        let json = serde_json::to_string(&ns).unwrap();
        let back: ModelNamespace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ns);
    }
}
