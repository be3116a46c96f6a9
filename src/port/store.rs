//! Store ports for persistence operations.
//!
//! This module defines the traits for persisting domain objects:
//! detections, labeled outcomes, trained model versions, and alerts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Alert, DetectionId, ModelNamespace, ModelVersion, Outcome, OutcomeId, PatternDetection, Symbol,
    VersionId,
};
use crate::error::Result;

/// Storage for pattern detections.
///
/// A detection is only considered emitted once `save` has returned
/// `Ok`; callers must not alert on a detection that failed to persist.
#[async_trait]
pub trait DetectionStore: Send + Sync {
    /// Save a detection, replacing if it exists.
    async fn save(&self, detection: &PatternDetection) -> Result<()>;

    /// Get a detection by ID.
    async fn get(&self, id: &DetectionId) -> Result<Option<PatternDetection>>;

    /// Detections for a symbol created at or after `since`, oldest first.
    async fn list_by_symbol_since(
        &self,
        symbol: &Symbol,
        since: DateTime<Utc>,
    ) -> Result<Vec<PatternDetection>>;

    /// Link a detection to its labeled outcome.
    ///
    /// Returns `false` if the detection does not exist.
    async fn attach_outcome(&self, id: &DetectionId, outcome_id: &OutcomeId) -> Result<bool>;
}

/// Append-only storage for labeled trade outcomes.
#[async_trait]
pub trait OutcomeStore: Send + Sync {
    /// Append an outcome.
    async fn append(&self, outcome: &Outcome) -> Result<()>;

    /// Outcomes closed at or after `since`, oldest first.
    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<Outcome>>;

    /// Fraction of wins for a pattern closed at or after `since`.
    ///
    /// `None` when the pattern has no outcomes in the window.
    async fn win_rate(&self, pattern_name: &str, since: DateTime<Utc>) -> Result<Option<f64>>;
}

/// Storage for trained model versions.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Persist a trained version (inactive until activated).
    async fn save_version(&self, version: &ModelVersion) -> Result<()>;

    /// The active version for a namespace, if any.
    async fn active_version(&self, namespace: &ModelNamespace) -> Result<Option<ModelVersion>>;

    /// Activate a version, deactivating any prior active version of the
    /// namespace in the same step.
    async fn activate(&self, namespace: &ModelNamespace, version_id: &VersionId) -> Result<()>;

    /// All persisted versions for a namespace, oldest first.
    async fn list_versions(&self, namespace: &ModelNamespace) -> Result<Vec<ModelVersion>>;
}

/// Append-only storage for raised alerts.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Append an alert.
    async fn append(&self, alert: &Alert) -> Result<()>;

    /// Most recent alerts, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Alert>>;
}
