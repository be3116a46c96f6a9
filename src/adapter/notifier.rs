//! Notification adapters.
//!
//! Implements the `port::Notifier` trait for the built-in backends.

use crate::port::{Event, Notifier};

/// Registry of notifiers.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Notify all registered notifiers.
    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    /// Number of registered notifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A no-op notifier for testing or when notifications are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// A logging notifier that logs events via tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        use tracing::info;
        match event {
            Event::DetectionEmitted(e) => {
                info!(
                    symbol = %e.symbol,
                    pattern = %e.pattern_name,
                    direction = %e.direction,
                    timeframe = %e.timeframe,
                    confidence = e.composite_confidence,
                    tier = %e.quality_tier,
                    mode = %e.mode,
                    risk_reward = e.risk_reward_ratio,
                    low_priority = e.low_priority,
                    "Detection emitted"
                );
            }
            Event::AlertRaised(e) => {
                info!(
                    symbol = %e.symbol,
                    pattern = %e.pattern_name,
                    confidence = e.composite_confidence,
                    "Alert raised"
                );
            }
            Event::AlertSuppressed {
                symbol,
                pattern_name,
                until,
            } => {
                info!(
                    symbol = %symbol,
                    pattern = %pattern_name,
                    until = %until,
                    "Alert suppressed"
                );
            }
            Event::OutcomeLabeled(e) => {
                info!(
                    symbol = %e.symbol,
                    pattern = %e.pattern_name,
                    win = e.win,
                    pnl = %e.pnl,
                    "Outcome labeled"
                );
            }
            Event::ModelPromoted(e) => {
                info!(
                    namespace = %e.namespace,
                    version = %e.version_id,
                    auc = e.auc,
                    prior_auc = ?e.prior_auc,
                    "Model promoted"
                );
            }
            Event::ModelRejected {
                namespace,
                candidate_auc,
                active_auc,
                floor,
            } => {
                info!(
                    namespace = %namespace,
                    candidate_auc,
                    active_auc,
                    floor,
                    "Model rejected"
                );
            }
            Event::ScanCompleted(e) => {
                info!(
                    scanned = e.symbols_scanned,
                    emitted = e.detections_emitted,
                    failed = e.symbols_failed,
                    "Scan completed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn scan_event() -> Event {
        Event::ScanCompleted(crate::port::ScanSummaryEvent {
            symbols_scanned: 3,
            detections_emitted: 1,
            symbols_failed: 0,
        })
    }

    struct CountingNotifier {
        count: Arc<AtomicUsize>,
    }

    impl Notifier for CountingNotifier {
        fn notify(&self, _event: Event) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_registry_notify_all() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = NotifierRegistry::new();

        registry.register(Box::new(CountingNotifier {
            count: count.clone(),
        }));
        registry.register(Box::new(CountingNotifier {
            count: count.clone(),
        }));

        registry.notify_all(scan_event());

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_null_notifier() {
        let notifier = NullNotifier;
        notifier.notify(scan_event());
    }

    #[test]
    fn test_registry_len_and_is_empty() {
        let mut registry = NotifierRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);

        registry.register(Box::new(NullNotifier));
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 1);
    }
}
