//! Periodic retraining driven by newly labeled outcomes.
//!
//! Each tick looks for outcomes closed since the last cursor. New
//! outcomes mark their pattern namespace (plus the global namespace)
//! as affected; affected namespaces are retrained on the full labeled
//! history and promoted through the registry when the candidate beats
//! the gate. A tick with nothing new is a no-op.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::adapter::NotifierRegistry;
use crate::domain::ModelNamespace;
use crate::error::{Result, TrainingError};
use crate::port::{DetectionStore, Event, ModelStore, OutcomeStore, PromotionEvent};

use super::registry::ModelRegistry;
use super::trainer::{train_candidate, TrainerConfig, TrainingSample};

/// Knobs for the retrain loop.
#[derive(Debug, Clone)]
pub struct RetrainConfig {
    /// Time between retrain ticks.
    pub interval: Duration,
    pub trainer: TrainerConfig,
}

impl Default for RetrainConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(180),
            trainer: TrainerConfig::default(),
        }
    }
}

/// Summary of one retrain tick.
#[derive(Debug, Clone)]
pub struct RetrainTickReport {
    /// Outcomes closed since the previous cursor.
    pub new_outcomes: usize,
    /// Labeled samples available after the detection join.
    pub dataset_size: usize,
    pub promoted: usize,
    pub rejected: usize,
    /// Namespaces skipped for insufficient data.
    pub skipped: usize,
    /// Cursor for the next tick, just past the newest outcome seen.
    pub new_cursor: DateTime<Utc>,
}

/// Run one retrain cycle over everything labeled so far.
///
/// The cursor only decides whether there is anything new and which
/// namespaces it touches; training always uses the full history so a
/// small batch of fresh outcomes cannot wash out the dataset.
pub async fn run_retrain_cycle(
    detections: &dyn DetectionStore,
    outcomes: &dyn OutcomeStore,
    models: &dyn ModelStore,
    registry: &ModelRegistry,
    notifiers: &NotifierRegistry,
    trainer_config: &TrainerConfig,
    cursor: DateTime<Utc>,
) -> Result<RetrainTickReport> {
    let fresh = outcomes.list_since(cursor).await?;
    if fresh.is_empty() {
        debug!("no new outcomes since last retrain cursor");
        return Ok(RetrainTickReport {
            new_outcomes: 0,
            dataset_size: 0,
            promoted: 0,
            rejected: 0,
            skipped: 0,
            new_cursor: cursor,
        });
    }
    let newest = fresh
        .iter()
        .map(|o| o.closed_at)
        .max()
        .unwrap_or(cursor);
    // Nudge past the newest outcome so it cannot re-trigger next tick.
    let new_cursor = newest + chrono::Duration::nanoseconds(1);

    let all = outcomes.list_since(DateTime::<Utc>::MIN_UTC).await?;
    let mut global_samples = Vec::with_capacity(all.len());
    let mut pattern_samples: HashMap<String, Vec<TrainingSample>> = HashMap::new();
    for outcome in &all {
        let Some(detection) = detections.get(&outcome.detection_id).await? else {
            debug!(
                detection_id = %outcome.detection_id,
                "outcome references an unknown detection, sample dropped"
            );
            continue;
        };
        if detection.feature_snapshot.is_empty() {
            continue;
        }
        let sample = TrainingSample {
            features: detection.feature_snapshot.clone(),
            label: outcome.win,
        };
        pattern_samples
            .entry(outcome.pattern_name.clone())
            .or_default()
            .push(sample.clone());
        global_samples.push(sample);
    }
    let dataset_size = global_samples.len();

    let mut affected = vec![ModelNamespace::Global];
    let mut seen_patterns: Vec<&str> = Vec::new();
    for outcome in &fresh {
        if !seen_patterns.contains(&outcome.pattern_name.as_str()) {
            seen_patterns.push(&outcome.pattern_name);
            affected.push(ModelNamespace::Pattern(outcome.pattern_name.clone()));
        }
    }

    let mut promoted = 0;
    let mut rejected = 0;
    let mut skipped = 0;
    let empty: Vec<TrainingSample> = Vec::new();
    for namespace in affected {
        let samples = match &namespace {
            ModelNamespace::Global => &global_samples,
            ModelNamespace::Pattern(name) => pattern_samples.get(name).unwrap_or(&empty),
        };
        let active_metric = registry.active(&namespace).map(|v| v.metric);

        match train_candidate(namespace.clone(), samples, active_metric, trainer_config) {
            Ok(version) => {
                let event = PromotionEvent {
                    namespace: version.namespace.clone(),
                    version_id: version.version_id.clone(),
                    auc: version.metric,
                    prior_auc: active_metric,
                };
                match registry.promote(models, version).await {
                    Ok(()) => {
                        info!(
                            namespace = %event.namespace,
                            auc = event.auc,
                            "promoted retrained model"
                        );
                        notifiers.notify_all(Event::ModelPromoted(event));
                        promoted += 1;
                    }
                    Err(error) => {
                        warn!(namespace = %event.namespace, %error, "model promotion failed");
                    }
                }
            }
            Err(TrainingError::InsufficientData { got, need }) => {
                debug!(%namespace, got, need, "not enough samples to retrain");
                skipped += 1;
            }
            Err(TrainingError::ModelRejected {
                candidate,
                active,
                floor,
            }) => {
                info!(
                    %namespace,
                    candidate_auc = candidate,
                    active_auc = active,
                    floor,
                    "candidate model rejected"
                );
                notifiers.notify_all(Event::ModelRejected {
                    namespace: namespace.clone(),
                    candidate_auc: candidate,
                    active_auc: active,
                    floor,
                });
                rejected += 1;
            }
            Err(error) => {
                warn!(%namespace, %error, "training failed");
                skipped += 1;
            }
        }
    }

    Ok(RetrainTickReport {
        new_outcomes: fresh.len(),
        dataset_size,
        promoted,
        rejected,
        skipped,
        new_cursor,
    })
}

/// Handle to control the retrain scheduler.
pub struct RetrainSchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl RetrainSchedulerHandle {
    /// Signal the scheduler to shut down gracefully.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Interval loop that retrains affected namespaces as outcomes land.
pub struct RetrainScheduler {
    detections: Arc<dyn DetectionStore>,
    outcomes: Arc<dyn OutcomeStore>,
    models: Arc<dyn ModelStore>,
    registry: Arc<ModelRegistry>,
    notifiers: Arc<NotifierRegistry>,
    config: RetrainConfig,
}

impl RetrainScheduler {
    pub fn new(
        detections: Arc<dyn DetectionStore>,
        outcomes: Arc<dyn OutcomeStore>,
        models: Arc<dyn ModelStore>,
        registry: Arc<ModelRegistry>,
        notifiers: Arc<NotifierRegistry>,
        config: RetrainConfig,
    ) -> Self {
        Self {
            detections,
            outcomes,
            models,
            registry,
            notifiers,
            config,
        }
    }

    /// Start the scheduler loop.
    ///
    /// Returns a handle to control the scheduler and a receiver for
    /// per-tick reports. The cursor starts at the epoch so the first
    /// productive tick trains on anything already persisted.
    pub fn start(self) -> (RetrainSchedulerHandle, mpsc::Receiver<RetrainTickReport>) {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (report_tx, report_rx) = mpsc::channel::<RetrainTickReport>(16);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(self.config.interval);
            // Skip the immediate first tick; there is nothing to train
            // on until the labeler has run.
            interval_timer.tick().await;

            let mut cursor = DateTime::<Utc>::MIN_UTC;
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("retrain scheduler shutting down");
                        break;
                    }
                    _ = interval_timer.tick() => {
                        let cycle = run_retrain_cycle(
                            self.detections.as_ref(),
                            self.outcomes.as_ref(),
                            self.models.as_ref(),
                            &self.registry,
                            &self.notifiers,
                            &self.config.trainer,
                            cursor,
                        )
                        .await;

                        let report = match cycle {
                            Ok(report) => report,
                            Err(error) => {
                                warn!(%error, "retrain cycle failed");
                                continue;
                            }
                        };
                        cursor = report.new_cursor;
                        if report_tx.send(report).await.is_err() {
                            debug!("retrain report receiver dropped");
                            break;
                        }
                    }
                }
            }
        });

        (RetrainSchedulerHandle { shutdown_tx }, report_rx)
    }
}
