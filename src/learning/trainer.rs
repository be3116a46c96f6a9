//! Logistic-regression training with an AUC promotion gate.
//!
//! The trainer is pure: it takes labeled samples and returns either a
//! candidate `ModelVersion` or a typed refusal. Joining outcomes with
//! stored feature snapshots happens in the retrain scheduler.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::domain::{sigmoid, ModelNamespace, ModelVersion, VersionId};
use crate::error::TrainingError;

/// One labeled training sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub features: Vec<f64>,
    /// Whether the detection resolved as a win.
    pub label: bool,
}

/// Knobs for a training run.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Labeled samples required before a fit is attempted.
    pub min_samples: usize,
    /// Candidate AUC must exceed this floor and the active metric.
    pub metric_floor: f64,
    pub epochs: usize,
    pub learning_rate: f64,
    /// Fraction of samples held out for the AUC estimate.
    pub holdout_fraction: f64,
    /// Shuffle seed; fixed in tests, random in production.
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            min_samples: 50,
            metric_floor: 0.60,
            epochs: 200,
            learning_rate: 0.1,
            holdout_fraction: 0.2,
            seed: None,
        }
    }
}

/// Fit a candidate model and gate it on holdout AUC.
///
/// The candidate must beat both the metric floor and the active
/// version's metric; otherwise `TrainingError::ModelRejected`.
pub fn train_candidate(
    namespace: ModelNamespace,
    samples: &[TrainingSample],
    active_metric: Option<f64>,
    config: &TrainerConfig,
) -> Result<ModelVersion, TrainingError> {
    if samples.len() < config.min_samples {
        return Err(TrainingError::InsufficientData {
            got: samples.len(),
            need: config.min_samples,
        });
    }
    let width = samples[0].features.len();
    if let Some(bad) = samples.iter().find(|s| s.features.len() != width) {
        return Err(TrainingError::FeatureWidthMismatch {
            got: bad.features.len(),
            expected: width,
        });
    }

    let mut shuffled: Vec<&TrainingSample> = samples.iter().collect();
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    shuffled.shuffle(&mut rng);

    let holdout_len = ((shuffled.len() as f64 * config.holdout_fraction) as usize).max(1);
    let (holdout, train) = shuffled.split_at(holdout_len);

    let (weights, bias) = fit_logistic(train, width, config.epochs, config.learning_rate);

    let score = |set: &[&TrainingSample]| -> (Vec<f64>, Vec<bool>) {
        let scores = set
            .iter()
            .map(|s| sigmoid(dot(&weights, &s.features) + bias))
            .collect();
        let labels = set.iter().map(|s| s.label).collect();
        (scores, labels)
    };

    // A single-class holdout cannot rank; fall back to the full set.
    let (scores, labels) = score(holdout);
    let candidate = auc(&scores, &labels)
        .or_else(|| {
            let (scores, labels) = score(&shuffled);
            auc(&scores, &labels)
        })
        .unwrap_or(0.5);

    let active = active_metric.unwrap_or(0.0);
    if candidate <= config.metric_floor || candidate <= active {
        return Err(TrainingError::ModelRejected {
            candidate,
            active,
            floor: config.metric_floor,
        });
    }

    debug!(
        namespace = %namespace,
        auc = candidate,
        samples = samples.len(),
        "trained candidate model"
    );
    Ok(ModelVersion {
        namespace,
        version_id: VersionId::new(),
        trained_at: chrono::Utc::now(),
        metric: candidate,
        weights,
        bias,
        feature_count: width,
        is_active: false,
    })
}

fn dot(weights: &[f64], features: &[f64]) -> f64 {
    weights.iter().zip(features).map(|(w, x)| w * x).sum()
}

/// Full-batch gradient descent on the logistic loss.
fn fit_logistic(samples: &[&TrainingSample], width: usize, epochs: usize, lr: f64) -> (Vec<f64>, f64) {
    let mut weights = vec![0.0; width];
    let mut bias = 0.0;
    let n = samples.len().max(1) as f64;
    for _ in 0..epochs {
        let mut grad_w = vec![0.0; width];
        let mut grad_b = 0.0;
        for sample in samples {
            let err = sigmoid(dot(&weights, &sample.features) + bias)
                - if sample.label { 1.0 } else { 0.0 };
            for (g, x) in grad_w.iter_mut().zip(&sample.features) {
                *g += err * x;
            }
            grad_b += err;
        }
        for (w, g) in weights.iter_mut().zip(&grad_w) {
            *w -= lr * g / n;
        }
        bias -= lr * grad_b / n;
    }
    (weights, bias)
}

/// Rank-based AUC with average ranks for ties.
///
/// `None` when one class is absent (the ranking is undefined).
fn auc(scores: &[f64], labels: &[bool]) -> Option<f64> {
    let pos = labels.iter().filter(|l| **l).count();
    let neg = labels.len() - pos;
    if pos == 0 || neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(label, _)| **label)
        .map(|(_, rank)| rank)
        .sum();
    Some((pos_rank_sum - (pos * (pos + 1)) as f64 / 2.0) / (pos * neg) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TrainerConfig {
        TrainerConfig {
            min_samples: 20,
            seed: Some(7),
            ..TrainerConfig::default()
        }
    }

    /// Winners lead with a positive first feature, losers negative.
    fn separable(n: usize) -> Vec<TrainingSample> {
        (0..n)
            .map(|i| {
                let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                let jitter = (i % 7) as f64 * 0.01;
                TrainingSample {
                    features: vec![sign * (0.5 + jitter), 0.3, -sign * 0.2],
                    label: sign > 0.0,
                }
            })
            .collect()
    }

    #[test]
    fn learns_a_separable_dataset() {
        let version = train_candidate(ModelNamespace::Global, &separable(80), None, &config())
            .expect("candidate should pass the gate");
        assert!(version.metric > 0.9, "AUC {}", version.metric);
        assert_eq!(version.feature_count, 3);
        assert!(!version.is_active);
    }

    #[test]
    fn too_few_samples_is_a_typed_refusal() {
        let err = train_candidate(ModelNamespace::Global, &separable(10), None, &config())
            .unwrap_err();
        assert!(matches!(
            err,
            TrainingError::InsufficientData { got: 10, need: 20 }
        ));
    }

    #[test]
    fn uninformative_features_are_rejected() {
        // Identical features with mixed labels: every score ties, AUC 0.5.
        let samples: Vec<TrainingSample> = (0..40)
            .map(|i| TrainingSample {
                features: vec![0.5, 0.5, 0.5],
                label: i % 2 == 0,
            })
            .collect();
        let err =
            train_candidate(ModelNamespace::Global, &samples, None, &config()).unwrap_err();
        match err {
            TrainingError::ModelRejected { candidate, floor, .. } => {
                assert!((candidate - 0.5).abs() < 1e-9);
                assert!((floor - 0.60).abs() < f64::EPSILON);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn candidate_must_beat_the_active_metric() {
        let err = train_candidate(
            ModelNamespace::Global,
            &separable(80),
            Some(0.999999),
            &config(),
        )
        .unwrap_err();
        assert!(matches!(err, TrainingError::ModelRejected { .. }));
    }

    #[test]
    fn mixed_feature_widths_are_refused() {
        let mut samples = separable(30);
        samples[3].features.push(0.0);
        let err =
            train_candidate(ModelNamespace::Global, &samples, None, &config()).unwrap_err();
        assert!(matches!(
            err,
            TrainingError::FeatureWidthMismatch { got: 4, expected: 3 }
        ));
    }

    #[test]
    fn auc_ranks_perfect_separation_at_one() {
        let scores = [0.9, 0.8, 0.2, 0.1];
        let labels = [true, true, false, false];
        assert!((auc(&scores, &labels).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn auc_is_undefined_for_a_single_class() {
        assert!(auc(&[0.9, 0.8], &[true, true]).is_none());
    }

    #[test]
    fn auc_credits_ties_at_half() {
        let scores = [0.5, 0.5, 0.5, 0.5];
        let labels = [true, false, true, false];
        assert!((auc(&scores, &labels).unwrap() - 0.5).abs() < 1e-9);
    }
}
