//! Score fusion: timeframe agreement and the composite confidence
//! engine.

mod confidence;
mod timeframe;

pub use confidence::{ConfidenceEngine, EngineSettings, LayerInputs, ModeWeights};
pub use timeframe::{ContextScore, TimeframeFusion, TimeframeScore};

/// Renormalize `weights` over the available entries only.
///
/// Each available weight is divided by the sum of available weights,
/// so relative proportions are preserved; unavailable entries get 0.
/// `None` when the slices disagree in length or nothing with positive
/// weight is available.
#[must_use]
pub fn redistribute(weights: &[f64], available: &[bool]) -> Option<Vec<f64>> {
    if weights.len() != available.len() {
        return None;
    }
    let total: f64 = weights
        .iter()
        .zip(available)
        .filter(|(_, a)| **a)
        .map(|(w, _)| *w)
        .sum();
    if total <= 0.0 {
        return None;
    }
    Some(
        weights
            .iter()
            .zip(available)
            .map(|(w, a)| if *a { w / total } else { 0.0 })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn all_available_is_identity_for_unit_weights() {
        let out = redistribute(&[0.35, 0.35, 0.15, 0.15], &[true; 4]).unwrap();
        assert_close(&out, &[0.35, 0.35, 0.15, 0.15]);
    }

    #[test]
    fn missing_entry_redistributes_proportionally() {
        let out = redistribute(&[0.35, 0.35, 0.15, 0.15], &[false, true, true, true]).unwrap();
        assert_close(&out, &[0.0, 0.35 / 0.65, 0.15 / 0.65, 0.15 / 0.65]);
        assert!((out.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        // Relative proportions among survivors are unchanged.
        assert!((out[1] / out[2] - 0.35 / 0.15).abs() < 1e-9);
    }

    #[test]
    fn single_survivor_takes_all_weight() {
        let out = redistribute(&[0.25, 0.35, 0.40], &[false, false, true]).unwrap();
        assert_close(&out, &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn nothing_available_is_none() {
        assert!(redistribute(&[0.5, 0.5], &[false, false]).is_none());
    }

    #[test]
    fn zero_weight_survivors_are_none() {
        assert!(redistribute(&[0.0, 1.0], &[true, false]).is_none());
    }

    #[test]
    fn mismatched_lengths_are_none() {
        assert!(redistribute(&[0.5, 0.5], &[true]).is_none());
    }

    #[test]
    fn zero_weight_layer_stays_zero_when_available() {
        // A mode that assigns no weight to a layer keeps it at zero even
        // when the layer reported a score.
        let out = redistribute(&[0.35, 0.35, 0.15, 0.15, 0.0], &[true; 5]).unwrap();
        assert_eq!(out[4], 0.0);
        assert!((out.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
