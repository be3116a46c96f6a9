//! Alert generation with per-signal dedup.
//!
//! A detection crossing the confidence threshold raises at most one
//! alert per symbol-and-pattern inside a sliding cooldown window
//! anchored at each emission. Raised alerts are persisted and fanned
//! out; suppressions are counted and logged at debug.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::adapter::NotifierRegistry;
use crate::domain::{Alert, AlertId, DedupKey, PatternDetection};
use crate::error::Result;
use crate::port::{AlertEvent, AlertStore, Event};

/// Knobs for alerting.
#[derive(Debug, Clone)]
pub struct AlertSettings {
    /// Minimum composite confidence for an alert.
    pub threshold: f64,
    /// Sliding suppression window after each emission.
    pub cooldown: std::time::Duration,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            threshold: 0.80,
            cooldown: std::time::Duration::from_secs(600),
        }
    }
}

/// What the generator decided for one detection.
#[derive(Debug, Clone)]
pub enum AlertDecision {
    Raised(Alert),
    Suppressed { until: DateTime<Utc> },
    BelowThreshold,
}

/// Turns qualifying detections into deduplicated alerts.
pub struct AlertGenerator {
    store: Arc<dyn AlertStore>,
    notifiers: Arc<NotifierRegistry>,
    settings: AlertSettings,
    cooldowns: DashMap<DedupKey, DateTime<Utc>>,
    suppressed: AtomicU64,
}

impl AlertGenerator {
    #[must_use]
    pub fn new(
        store: Arc<dyn AlertStore>,
        notifiers: Arc<NotifierRegistry>,
        settings: AlertSettings,
    ) -> Self {
        Self {
            store,
            notifiers,
            settings,
            cooldowns: DashMap::new(),
            suppressed: AtomicU64::new(0),
        }
    }

    /// Decide whether this detection raises an alert.
    ///
    /// The cooldown is recorded only after the alert is persisted, so a
    /// failed append leaves the window open for a retry.
    pub async fn process(&self, detection: &PatternDetection) -> Result<AlertDecision> {
        if detection.composite_confidence < self.settings.threshold {
            return Ok(AlertDecision::BelowThreshold);
        }

        let key = DedupKey::new(&detection.symbol, &detection.pattern_name);
        let now = Utc::now();
        let active_window = self.cooldowns.get(&key).map(|entry| *entry);
        if let Some(until) = active_window {
            if until > now {
                self.suppressed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    symbol = %detection.symbol,
                    pattern = %detection.pattern_name,
                    %until,
                    "alert suppressed inside the cooldown window"
                );
                self.notifiers.notify_all(Event::AlertSuppressed {
                    symbol: detection.symbol.to_string(),
                    pattern_name: detection.pattern_name.clone(),
                    until,
                });
                return Ok(AlertDecision::Suppressed { until });
            }
        }

        let until = now
            + chrono::Duration::from_std(self.settings.cooldown)
                .unwrap_or_else(|_| chrono::Duration::zero());
        let alert = Alert {
            id: AlertId::new(),
            symbol: detection.symbol.clone(),
            pattern_name: detection.pattern_name.clone(),
            composite_confidence: detection.composite_confidence,
            created_at: now,
            dedup_key: key,
            suppressed_until: until,
        };
        self.store.append(&alert).await?;
        self.cooldowns.insert(key, until);
        self.notifiers
            .notify_all(Event::AlertRaised(AlertEvent::from(&alert)));
        Ok(AlertDecision::Raised(alert))
    }

    /// Total suppressions since startup.
    #[must_use]
    pub fn suppressed_total(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }
}

/// Drain the detection channel into the generator.
///
/// Runs until the sending side is dropped; processing errors are
/// logged and the task keeps draining.
pub fn spawn_alert_task(
    generator: Arc<AlertGenerator>,
    mut detections: mpsc::Receiver<PatternDetection>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(detection) = detections.recv().await {
            if let Err(error) = generator.process(&detection).await {
                warn!(%error, "alert processing failed");
            }
        }
        debug!("alert channel closed, alert task stopping");
    })
}
