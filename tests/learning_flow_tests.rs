//! The learning loop end to end: detections are labeled as bars
//! resolve them, labeled outcomes retrain the models, and promoted
//! models score the next detection pass.

mod support;

use std::collections::BTreeMap;
use std::sync::Arc;

use chartist::adapter::{MemoryStore, NotifierRegistry, ReplayProvider, StaticSource};
use chartist::detector::{LearnedDetector, FEATURE_COUNT};
use chartist::domain::{
    Bar, DetectionId, Direction, FusionMode, LabelingPolicy, Layer, ModelNamespace,
    PaperPosition, PatternDetection, QualityTier, SourceKind, Symbol, Timeframe,
};
use chartist::fusion::{ConfidenceEngine, EngineSettings};
use chartist::learning::{run_retrain_cycle, ModelRegistry, OutcomeLabeler};
use chartist::port::{DetectionStore, Event, OutcomeStore};
use chartist::service::{DetectionDeps, DetectionService, SentimentAggregator};
use chartist::testkit::config;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use support::notifier::RecordingNotifier;
use support::windows::{engulfing_window, load_standard_timeframes, quiet_window};

/// A tracked bullish detection whose feature snapshot leans with its
/// eventual label, so the dataset is learnable.
fn seeded_detection(winner: bool, index: i64, created_at: DateTime<Utc>) -> PatternDetection {
    let lean = if winner { 0.7 } else { -0.7 };
    let mut features = vec![0.1; FEATURE_COUNT];
    features[0] = lean + (index % 5) as f64 * 0.02;
    features[1] = lean / 2.0;
    PatternDetection {
        id: DetectionId::new(),
        symbol: Symbol::new("BTC-USD"),
        timeframe: Timeframe::H1,
        pattern_name: "bullish_engulfing".into(),
        direction: Direction::Bullish,
        detector_scores: BTreeMap::new(),
        composite_confidence: 0.7,
        quality_tier: QualityTier::Good,
        mode: FusionMode::Conservative,
        entry_price: dec!(100),
        stop_loss: dec!(97),
        take_profit: dec!(106),
        risk_reward_ratio: 2.0,
        low_priority: false,
        explanation: vec![],
        quality_factors: BTreeMap::new(),
        feature_snapshot: features,
        created_at,
        outcome_id: None,
    }
}

fn resolving_bar(high: Decimal, low: Decimal, at: DateTime<Utc>) -> Bar {
    Bar {
        symbol: Symbol::new("BTC-USD"),
        timeframe: Timeframe::H1,
        open: dec!(100),
        high,
        low,
        close: (high + low) / Decimal::TWO,
        volume: dec!(1000),
        timestamp: at,
    }
}

fn recording_registry() -> (RecordingNotifier, Arc<NotifierRegistry>) {
    let recorder = RecordingNotifier::new();
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(recorder.clone()));
    (recorder, Arc::new(registry))
}

#[tokio::test]
async fn labeled_outcomes_promote_and_serve_models() {
    let store = Arc::new(MemoryStore::new());
    let (recorder, notifiers) = recording_registry();
    let labeler = OutcomeLabeler::new(
        store.clone(),
        store.clone(),
        notifiers.clone(),
        LabelingPolicy::StopOrTarget { max_bars: 20 },
    );

    // Sixteen positions resolve at the target, fourteen at the stop.
    let base = Utc::now() - Duration::hours(6);
    let mut first_winner = None;
    for i in 0..16 {
        let detection = seeded_detection(true, i, base);
        first_winner.get_or_insert(detection.id.clone());
        store.save(&detection).await.unwrap();
        labeler.track(&detection);
    }
    let wins = labeler
        .on_bar(&resolving_bar(dec!(107), dec!(99), base + Duration::hours(1)))
        .await;
    for i in 0..14 {
        let detection = seeded_detection(false, i, base + Duration::hours(2));
        store.save(&detection).await.unwrap();
        labeler.track(&detection);
    }
    let losses = labeler
        .on_bar(&resolving_bar(dec!(100.5), dec!(96.5), base + Duration::hours(3)))
        .await;

    assert_eq!(wins.len(), 16);
    assert!(wins.iter().all(|outcome| outcome.win));
    assert_eq!(losses.len(), 14);
    assert!(losses.iter().all(|outcome| !outcome.win));
    assert_eq!(labeler.open_positions(), 0);

    // The winning detection is linked back to its outcome.
    let linked = store
        .get(&first_winner.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(linked.outcome_id.is_some());

    // One retrain cycle picks the outcomes up and promotes both the
    // pattern namespace and the global fallback.
    let registry = Arc::new(ModelRegistry::new());
    let report = run_retrain_cycle(
        store.as_ref(),
        store.as_ref(),
        store.as_ref(),
        &registry,
        &notifiers,
        &config::trainer(),
        DateTime::<Utc>::MIN_UTC,
    )
    .await
    .unwrap();

    assert_eq!(report.new_outcomes, 30);
    assert_eq!(report.dataset_size, 30);
    assert_eq!(report.promoted, 2);
    assert!(registry.active(&ModelNamespace::Global).is_some());
    let pattern_ns = ModelNamespace::Pattern("bullish_engulfing".into());
    assert!(registry.active(&pattern_ns).is_some());
    assert_eq!(
        recorder
            .events()
            .iter()
            .filter(|event| matches!(event, Event::ModelPromoted(_)))
            .count(),
        2
    );

    // The learned layer now serves scores, preferring the pattern
    // model and falling back to global for unmodeled patterns.
    let detector = LearnedDetector::new(registry.clone());
    let window = quiet_window("BTC-USD");
    let scored = detector.score(&window, "bullish_engulfing").unwrap();
    assert_eq!(scored.namespace, pattern_ns);
    assert!((0.0..=1.0).contains(&scored.raw_confidence));
    let fallback = detector.score(&window, "doji").unwrap();
    assert_eq!(fallback.namespace, ModelNamespace::Global);

    // A fresh registry hydrates the same actives from the store.
    let rehydrated = ModelRegistry::new();
    let loaded = rehydrated
        .hydrate(store.as_ref(), &[ModelNamespace::Global, pattern_ns.clone()])
        .await
        .unwrap();
    assert_eq!(loaded, 2);
    assert!(rehydrated.active(&pattern_ns).is_some());
}

#[tokio::test]
async fn promoted_model_scores_the_next_detection_pass() {
    let store = Arc::new(MemoryStore::new());
    let (_, notifiers) = recording_registry();

    // Seed linked detection and outcome pairs directly; the labeler
    // path is covered above.
    let base = Utc::now() - Duration::hours(6);
    for i in 0..30 {
        let winner = i % 2 == 0;
        let detection = seeded_detection(winner, i, base);
        store.save(&detection).await.unwrap();
        let mut position =
            PaperPosition::open(&detection, LabelingPolicy::StopOrTarget { max_bars: 20 });
        let exit_bar = if winner {
            resolving_bar(dec!(107), dec!(99), base + Duration::hours(1))
        } else {
            resolving_bar(dec!(100.5), dec!(96.5), base + Duration::hours(1))
        };
        let exit = position.advance(&exit_bar).expect("bar resolves the position");
        store.append(&position.into_outcome(exit)).await.unwrap();
    }

    let registry = Arc::new(ModelRegistry::new());
    let report = run_retrain_cycle(
        store.as_ref(),
        store.as_ref(),
        store.as_ref(),
        &registry,
        &notifiers,
        &config::trainer(),
        DateTime::<Utc>::MIN_UTC,
    )
    .await
    .unwrap();
    assert!(report.promoted >= 1);

    // Wire the pipeline with the promoted registry; the next pass on a
    // fresh engulfing window carries a learned score.
    let provider = ReplayProvider::new();
    load_standard_timeframes(&provider, "BTC-USD", &engulfing_window("BTC-USD"));
    let labeler = Arc::new(OutcomeLabeler::new(
        store.clone(),
        store.clone(),
        notifiers.clone(),
        LabelingPolicy::StopOrTarget { max_bars: 20 },
    ));
    let (alert_tx, _alert_rx) = mpsc::channel(8);
    let service = DetectionService::new(
        DetectionDeps {
            market: Arc::new(provider),
            detections: store.clone(),
            outcomes: store.clone(),
            sentiment: Arc::new(SentimentAggregator::new(
                vec![Arc::new(StaticSource::new(SourceKind::News, 0.4))],
                config::sentiment(),
            )),
            labeler,
            notifiers,
            models: registry,
            alert_tx,
        },
        config::standard_fusion(),
        ConfidenceEngine::new(EngineSettings::default()),
        config::detection(),
    );

    let detection = service
        .detect(&Symbol::new("BTC-USD"), FusionMode::Conservative)
        .await
        .unwrap()
        .expect("engulfing window completes a detection");

    assert_eq!(detection.pattern_name, "bullish_engulfing");
    assert!(detection.detector_scores.contains_key(&Layer::Learned));
    assert!(detection.detector_scores.contains_key(&Layer::RuleBased));
    assert!(detection.composite_confidence > 0.0);
    assert!(detection.composite_confidence <= 1.0);
}
