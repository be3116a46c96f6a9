//! In-memory store adapters.
//!
//! One `MemoryStore` implements all four store ports behind
//! `parking_lot` locks. Snapshots are cloned out so callers never hold
//! a lock across an await point.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::{
    Alert, DetectionId, ModelNamespace, ModelVersion, Outcome, OutcomeId, PatternDetection, Symbol,
    VersionId,
};
use crate::error::{Error, Result};
use crate::port::{AlertStore, DetectionStore, ModelStore, OutcomeStore};

/// Thread-safe in-memory persistence.
///
/// The default backend for tests and replay runs; the store ports keep
/// a durable backend swappable without touching the services.
pub struct MemoryStore {
    detections: RwLock<HashMap<DetectionId, PatternDetection>>,
    outcomes: RwLock<Vec<Outcome>>,
    versions: RwLock<Vec<ModelVersion>>,
    alerts: RwLock<Vec<Alert>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            detections: RwLock::new(HashMap::new()),
            outcomes: RwLock::new(Vec::new()),
            versions: RwLock::new(Vec::new()),
            alerts: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored detections.
    #[must_use]
    pub fn detection_count(&self) -> usize {
        self.detections.read().len()
    }

    /// Number of stored outcomes.
    #[must_use]
    pub fn outcome_count(&self) -> usize {
        self.outcomes.read().len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DetectionStore for MemoryStore {
    async fn save(&self, detection: &PatternDetection) -> Result<()> {
        self.detections
            .write()
            .insert(detection.id.clone(), detection.clone());
        Ok(())
    }

    async fn get(&self, id: &DetectionId) -> Result<Option<PatternDetection>> {
        Ok(self.detections.read().get(id).cloned())
    }

    async fn list_by_symbol_since(
        &self,
        symbol: &Symbol,
        since: DateTime<Utc>,
    ) -> Result<Vec<PatternDetection>> {
        let mut matched: Vec<PatternDetection> = self
            .detections
            .read()
            .values()
            .filter(|d| d.symbol == *symbol && d.created_at >= since)
            .cloned()
            .collect();
        matched.sort_by_key(|d| d.created_at);
        Ok(matched)
    }

    async fn attach_outcome(&self, id: &DetectionId, outcome_id: &OutcomeId) -> Result<bool> {
        match self.detections.write().get_mut(id) {
            Some(detection) => {
                detection.outcome_id = Some(outcome_id.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl OutcomeStore for MemoryStore {
    async fn append(&self, outcome: &Outcome) -> Result<()> {
        self.outcomes.write().push(outcome.clone());
        Ok(())
    }

    async fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<Outcome>> {
        let mut matched: Vec<Outcome> = self
            .outcomes
            .read()
            .iter()
            .filter(|o| o.closed_at >= since)
            .cloned()
            .collect();
        matched.sort_by_key(|o| o.closed_at);
        Ok(matched)
    }

    async fn win_rate(&self, pattern_name: &str, since: DateTime<Utc>) -> Result<Option<f64>> {
        let outcomes = self.outcomes.read();
        let mut total = 0usize;
        let mut wins = 0usize;
        for outcome in outcomes
            .iter()
            .filter(|o| o.pattern_name == pattern_name && o.closed_at >= since)
        {
            total += 1;
            if outcome.win {
                wins += 1;
            }
        }
        if total == 0 {
            return Ok(None);
        }
        Ok(Some(wins as f64 / total as f64))
    }
}

#[async_trait]
impl ModelStore for MemoryStore {
    async fn save_version(&self, version: &ModelVersion) -> Result<()> {
        self.versions.write().push(version.clone());
        Ok(())
    }

    async fn active_version(&self, namespace: &ModelNamespace) -> Result<Option<ModelVersion>> {
        Ok(self
            .versions
            .read()
            .iter()
            .find(|v| v.namespace == *namespace && v.is_active)
            .cloned())
    }

    async fn activate(&self, namespace: &ModelNamespace, version_id: &VersionId) -> Result<()> {
        let mut versions = self.versions.write();
        if !versions
            .iter()
            .any(|v| v.namespace == *namespace && v.version_id == *version_id)
        {
            return Err(Error::PersistenceFailure {
                operation: "activate",
                reason: format!("unknown version {version_id} for {namespace}"),
            });
        }
        for version in versions.iter_mut().filter(|v| v.namespace == *namespace) {
            version.is_active = version.version_id == *version_id;
        }
        Ok(())
    }

    async fn list_versions(&self, namespace: &ModelNamespace) -> Result<Vec<ModelVersion>> {
        Ok(self
            .versions
            .read()
            .iter()
            .filter(|v| v.namespace == *namespace)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn append(&self, alert: &Alert) -> Result<()> {
        self.alerts.write().push(alert.clone());
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Alert>> {
        let mut alerts: Vec<Alert> = self.alerts.read().clone();
        alerts.sort_by_key(|a| std::cmp::Reverse(a.created_at));
        alerts.truncate(limit);
        Ok(alerts)
    }
}
