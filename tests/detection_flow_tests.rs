//! End-to-end detection flow: replayed bars in, persisted detections
//! and deduplicated alerts out.

mod support;

use std::sync::Arc;

use chartist::adapter::{MemoryStore, NotifierRegistry, ReplayProvider, StaticSource};
use chartist::domain::{FusionMode, LabelingPolicy, SourceKind, Symbol};
use chartist::fusion::{ConfidenceEngine, EngineSettings};
use chartist::learning::{ModelRegistry, OutcomeLabeler};
use chartist::port::{AlertStore, Event};
use chartist::service::{
    run_scan_cycle, spawn_alert_task, AlertGenerator, AlertSettings, DetectionDeps,
    DetectionService, SentimentAggregator,
};
use chartist::testkit::config;
use tokio::sync::mpsc;

use support::notifier::RecordingNotifier;
use support::windows::{engulfing_window, load_standard_timeframes, quiet_window};

struct Flow {
    service: DetectionService,
    store: Arc<MemoryStore>,
    labeler: Arc<OutcomeLabeler>,
    recorder: RecordingNotifier,
    notifiers: Arc<NotifierRegistry>,
    alert_task: tokio::task::JoinHandle<()>,
}

fn wire(provider: ReplayProvider, alert_settings: AlertSettings) -> Flow {
    let store = Arc::new(MemoryStore::new());
    let recorder = RecordingNotifier::new();
    let notifiers = {
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(recorder.clone()));
        Arc::new(registry)
    };
    let labeler = Arc::new(OutcomeLabeler::new(
        store.clone(),
        store.clone(),
        notifiers.clone(),
        LabelingPolicy::StopOrTarget { max_bars: 20 },
    ));
    let (alert_tx, alert_rx) = mpsc::channel(16);
    let generator = Arc::new(AlertGenerator::new(
        store.clone(),
        notifiers.clone(),
        alert_settings,
    ));
    let alert_task = spawn_alert_task(generator, alert_rx);
    let sentiment = Arc::new(SentimentAggregator::new(
        vec![Arc::new(StaticSource::new(SourceKind::News, 0.5))],
        config::sentiment(),
    ));
    let service = DetectionService::new(
        DetectionDeps {
            market: Arc::new(provider),
            detections: store.clone(),
            outcomes: store.clone(),
            sentiment,
            labeler: labeler.clone(),
            notifiers: notifiers.clone(),
            models: Arc::new(ModelRegistry::new()),
            alert_tx,
        },
        config::standard_fusion(),
        ConfidenceEngine::new(EngineSettings::default()),
        config::detection(),
    );
    Flow {
        service,
        store,
        labeler,
        recorder,
        notifiers,
        alert_task,
    }
}

/// Alert settings every emitted detection clears, so the flow is
/// deterministic regardless of the exact composite value.
fn permissive_alerts() -> AlertSettings {
    AlertSettings {
        threshold: 0.2,
        ..AlertSettings::default()
    }
}

#[tokio::test]
async fn scan_cycle_detects_persists_and_alerts() {
    let provider = ReplayProvider::new();
    load_standard_timeframes(&provider, "BTC-USD", &engulfing_window("BTC-USD"));
    // ETH-USD is on the watchlist but has no bars loaded.
    let flow = wire(provider, permissive_alerts());

    let watchlist = vec![Symbol::new("BTC-USD"), Symbol::new("ETH-USD")];
    let report = run_scan_cycle(
        &flow.service,
        &watchlist,
        FusionMode::Conservative,
        &flow.notifiers,
    )
    .await;

    assert_eq!(report.symbols_scanned, 2);
    assert_eq!(report.detections_emitted, 1);
    assert_eq!(report.symbols_failed, 1);
    assert_eq!(flow.store.detection_count(), 1);
    assert_eq!(flow.labeler.open_positions(), 1);

    // Closing the pipeline flushes the alert task.
    drop(flow.service);
    flow.alert_task.await.unwrap();

    let alerts = AlertStore::list_recent(flow.store.as_ref(), 10).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].symbol, Symbol::new("BTC-USD"));

    assert_eq!(flow.recorder.count_detections(), 1);
    assert_eq!(flow.recorder.count_raised_alerts(), 1);
    assert!(flow
        .recorder
        .events()
        .iter()
        .any(|event| matches!(event, Event::ScanCompleted(summary) if summary.symbols_failed == 1)));
}

#[tokio::test]
async fn repeat_scan_raises_one_alert_per_cooldown_window() {
    let provider = ReplayProvider::new();
    load_standard_timeframes(&provider, "BTC-USD", &engulfing_window("BTC-USD"));
    let flow = wire(provider, permissive_alerts());

    let watchlist = vec![Symbol::new("BTC-USD")];
    for _ in 0..2 {
        run_scan_cycle(
            &flow.service,
            &watchlist,
            FusionMode::Conservative,
            &flow.notifiers,
        )
        .await;
    }

    drop(flow.service);
    flow.alert_task.await.unwrap();

    // Both cycles re-detect the same signal; only the first one alerts.
    assert_eq!(flow.store.detection_count(), 2);
    let alerts = AlertStore::list_recent(flow.store.as_ref(), 10).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(flow.recorder.count_raised_alerts(), 1);
    assert!(flow
        .recorder
        .events()
        .iter()
        .any(|event| matches!(event, Event::AlertSuppressed { .. })));
}

#[tokio::test]
async fn quiet_market_raises_nothing() {
    let provider = ReplayProvider::new();
    load_standard_timeframes(&provider, "BTC-USD", &quiet_window("BTC-USD"));
    let flow = wire(provider, permissive_alerts());

    let report = run_scan_cycle(
        &flow.service,
        &[Symbol::new("BTC-USD")],
        FusionMode::Conservative,
        &flow.notifiers,
    )
    .await;

    assert_eq!(report.detections_emitted, 0);
    assert_eq!(report.symbols_failed, 0);
    assert_eq!(flow.store.detection_count(), 0);

    drop(flow.service);
    flow.alert_task.await.unwrap();

    let alerts = AlertStore::list_recent(flow.store.as_ref(), 10).await.unwrap();
    assert!(alerts.is_empty());
    assert_eq!(flow.recorder.count_raised_alerts(), 0);
}
