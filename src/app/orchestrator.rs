//! App orchestration module.
//!
//! Wires the adapters, services, and background tasks that make up a
//! running scanner and keeps them alive until shutdown.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::adapter::{
    synthetic_series, LogNotifier, MemoryStore, NotifierRegistry, ReplayProvider, StaticSource,
};
use crate::app::config::Config;
use crate::domain::{ModelNamespace, SourceKind, Symbol, Timeframe};
use crate::error::Result;
use crate::fusion::ConfidenceEngine;
use crate::learning::{ModelRegistry, OutcomeLabeler, RetrainScheduler};
use crate::port::SentimentSource;
use crate::service::{
    spawn_alert_task, AlertGenerator, DetectionDeps, DetectionService, MarketScanner,
    SentimentAggregator,
};

/// Bars preloaded per (symbol, timeframe) for offline runs.
const REPLAY_SERIES_LEN: usize = 400;

/// Main application struct.
pub struct App;

impl App {
    /// Run the scanner until the task channels close.
    ///
    /// The default composition is fully offline: market data comes from
    /// a seeded replay provider and sentiment from static sources.
    /// Library users wanting live feeds compose [`DetectionService`]
    /// with their own adapters instead.
    pub async fn run(config: Config) -> Result<()> {
        let scanner_config = config.scanner_config()?;
        let fusion = config.timeframe_fusion()?;
        let engine = ConfidenceEngine::new(config.engine_settings()?);

        let store = Arc::new(MemoryStore::new());

        let provider = Arc::new(ReplayProvider::new());
        seed_replay_provider(
            &provider,
            &scanner_config.watchlist,
            fusion.timeframes(),
            config.scanner.min_bars,
        );

        let notifiers = Arc::new(build_notifier_registry());
        info!(notifiers = notifiers.len(), "notifiers initialized");

        let models = Arc::new(ModelRegistry::new());
        let namespaces = model_namespaces();
        let hydrated = models.hydrate(store.as_ref(), &namespaces).await?;
        info!(
            namespaces = namespaces.len(),
            hydrated, "model registry ready"
        );

        let sentiment = Arc::new(SentimentAggregator::new(
            demo_sentiment_sources(),
            config.sentiment_settings(),
        ));

        let labeler = Arc::new(OutcomeLabeler::new(
            store.clone(),
            store.clone(),
            notifiers.clone(),
            config.labeling_policy()?,
        ));

        let (alert_tx, alert_rx) = mpsc::channel(64);

        let service = Arc::new(DetectionService::new(
            DetectionDeps {
                market: provider,
                detections: store.clone(),
                outcomes: store.clone(),
                sentiment,
                labeler,
                notifiers: notifiers.clone(),
                models: models.clone(),
                alert_tx,
            },
            fusion,
            engine,
            config.detection_settings(),
        ));

        let generator = Arc::new(AlertGenerator::new(
            store.clone(),
            notifiers.clone(),
            config.alert_settings(),
        ));
        let alert_task = spawn_alert_task(generator, alert_rx);

        let scanner = MarketScanner::new(service, notifiers.clone(), scanner_config);
        let (_scanner_handle, mut scan_reports) = scanner.start();

        let scheduler = RetrainScheduler::new(
            store.clone(),
            store.clone(),
            store.clone(),
            models,
            notifiers,
            config.retrain_config(),
        );
        let (_retrain_handle, mut retrain_reports) = scheduler.start();

        info!("chartist running");

        // Both report channels stay drained here; a closed channel means
        // its task died and the app should come down with it.
        loop {
            tokio::select! {
                report = scan_reports.recv() => match report {
                    Some(report) => {
                        debug!(
                            scanned = report.symbols_scanned,
                            emitted = report.detections_emitted,
                            failed = report.symbols_failed,
                            "scan cycle reported"
                        );
                    }
                    None => break,
                },
                report = retrain_reports.recv() => match report {
                    Some(report) => {
                        debug!(
                            dataset = report.dataset_size,
                            promoted = report.promoted,
                            rejected = report.rejected,
                            "retrain cycle reported"
                        );
                    }
                    None => break,
                },
            }
        }

        alert_task.abort();
        Ok(())
    }
}

/// Build the notifier registry for the default composition.
fn build_notifier_registry() -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));
    registry
}

/// One namespace per catalog pattern, plus the global fallback.
pub(crate) fn model_namespaces() -> Vec<ModelNamespace> {
    let catalog = crate::domain::rules::RuleCatalog::standard();
    let mut namespaces = vec![ModelNamespace::Global];
    namespaces.extend(
        catalog
            .rules()
            .iter()
            .map(|rule| ModelNamespace::Pattern(rule.name().to_string())),
    );
    namespaces
}

/// Preload a deterministic tape for every watched pair.
pub(crate) fn seed_replay_provider(
    provider: &ReplayProvider,
    watchlist: &[Symbol],
    timeframes: &[Timeframe],
    min_bars: usize,
) {
    let count = REPLAY_SERIES_LEN.max(min_bars);
    for symbol in watchlist {
        for timeframe in timeframes {
            provider.load(
                symbol.clone(),
                *timeframe,
                synthetic_series(symbol, *timeframe, count),
            );
        }
    }
    info!(
        symbols = watchlist.len(),
        timeframes = timeframes.len(),
        bars = count,
        "replay provider seeded with synthetic series"
    );
}

/// Placeholder sources for offline runs; scores are mild and fixed.
pub(crate) fn demo_sentiment_sources() -> Vec<Arc<dyn SentimentSource>> {
    vec![
        Arc::new(StaticSource::new(SourceKind::News, 0.3)),
        Arc::new(StaticSource::new(SourceKind::Social, 0.1)),
        Arc::new(StaticSource::new(SourceKind::Market, -0.1)),
    ]
}
