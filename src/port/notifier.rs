//! Notifier port for event notifications.
//!
//! This module defines the trait for sending notifications about
//! system events such as emitted detections, raised alerts, labeled
//! outcomes, and model promotions.

use rust_decimal::Decimal;

use crate::domain::{
    Alert, Direction, FusionMode, ModelNamespace, Outcome, PatternDetection, QualityTier,
    Timeframe, VersionId,
};

/// Events that can trigger notifications.
#[derive(Debug, Clone)]
pub enum Event {
    /// A detection was scored, persisted, and emitted.
    DetectionEmitted(DetectionEvent),
    /// An alert cleared the dedup window and was raised.
    AlertRaised(AlertEvent),
    /// A repeat alert landed inside its dedup window.
    AlertSuppressed {
        symbol: String,
        pattern_name: String,
        until: chrono::DateTime<chrono::Utc>,
    },
    /// A paper position closed and the outcome was labeled.
    OutcomeLabeled(OutcomeEvent),
    /// A retrained model beat the promotion gate.
    ModelPromoted(PromotionEvent),
    /// A retrained candidate failed the promotion gate.
    ModelRejected {
        namespace: ModelNamespace,
        candidate_auc: f64,
        active_auc: f64,
        floor: f64,
    },
    /// One full scan cycle finished.
    ScanCompleted(ScanSummaryEvent),
}

/// Detection emission event.
#[derive(Debug, Clone)]
pub struct DetectionEvent {
    pub symbol: String,
    pub pattern_name: String,
    pub direction: Direction,
    pub timeframe: Timeframe,
    pub composite_confidence: f64,
    pub quality_tier: QualityTier,
    pub mode: FusionMode,
    pub risk_reward_ratio: f64,
    pub low_priority: bool,
}

impl From<&PatternDetection> for DetectionEvent {
    fn from(detection: &PatternDetection) -> Self {
        Self {
            symbol: detection.symbol.to_string(),
            pattern_name: detection.pattern_name.clone(),
            direction: detection.direction,
            timeframe: detection.timeframe,
            composite_confidence: detection.composite_confidence,
            quality_tier: detection.quality_tier,
            mode: detection.mode,
            risk_reward_ratio: detection.risk_reward_ratio,
            low_priority: detection.low_priority,
        }
    }
}

/// Alert event.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub symbol: String,
    pub pattern_name: String,
    pub composite_confidence: f64,
}

impl From<&Alert> for AlertEvent {
    fn from(alert: &Alert) -> Self {
        Self {
            symbol: alert.symbol.to_string(),
            pattern_name: alert.pattern_name.clone(),
            composite_confidence: alert.composite_confidence,
        }
    }
}

/// Labeled outcome event.
#[derive(Debug, Clone)]
pub struct OutcomeEvent {
    pub symbol: String,
    pub pattern_name: String,
    pub win: bool,
    pub pnl: Decimal,
}

impl From<&Outcome> for OutcomeEvent {
    fn from(outcome: &Outcome) -> Self {
        Self {
            symbol: outcome.symbol.to_string(),
            pattern_name: outcome.pattern_name.clone(),
            win: outcome.win,
            pnl: outcome.pnl,
        }
    }
}

/// Model promotion event.
#[derive(Debug, Clone)]
pub struct PromotionEvent {
    pub namespace: ModelNamespace,
    pub version_id: VersionId,
    pub auc: f64,
    /// AUC of the version that was replaced, if any.
    pub prior_auc: Option<f64>,
}

/// Scan cycle summary event.
#[derive(Debug, Clone)]
pub struct ScanSummaryEvent {
    pub symbols_scanned: usize,
    pub detections_emitted: usize,
    pub symbols_failed: usize,
}

/// Trait for notification handlers.
///
/// Implement this trait to receive events from the system.
/// Notifications are fire-and-forget (async but not awaited).
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - The `notify` method should not block or perform slow I/O synchronously
/// - Consider spawning async tasks for slow operations
pub trait Notifier: Send + Sync {
    /// Handle an event.
    ///
    /// This method should return quickly. For slow operations (e.g., HTTP calls),
    /// implementations should spawn an async task.
    fn notify(&self, event: Event);
}
