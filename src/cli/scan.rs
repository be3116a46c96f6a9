//! Handler for the `scan` command.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::adapter::{MemoryStore, NotifierRegistry, ReplayProvider};
use crate::app::{demo_sentiment_sources, seed_replay_provider, Config};
use crate::cli::ScanArgs;
use crate::domain::{PatternDetection, Symbol};
use crate::error::Result;
use crate::fusion::ConfidenceEngine;
use crate::learning::{ModelRegistry, OutcomeLabeler};
use crate::service::{DetectionDeps, DetectionService, SentimentAggregator};

/// Execute the scan command: one detection pass over a replayed series.
pub async fn execute(args: &ScanArgs) -> Result<()> {
    let mut config = if args.config.exists() {
        Config::load(&args.config)?
    } else {
        Config::default()
    };
    if let Some(ref mode) = args.mode {
        config.fusion.mode = mode.clone();
    }
    config.init_logging();

    let mode = config.fusion_mode()?;
    let fusion = config.timeframe_fusion()?;
    let engine = ConfidenceEngine::new(config.engine_settings()?);
    let symbol = Symbol::new(args.symbol.as_str());

    let provider = Arc::new(ReplayProvider::new());
    seed_replay_provider(
        &provider,
        std::slice::from_ref(&symbol),
        fusion.timeframes(),
        config.scanner.min_bars,
    );

    let store = Arc::new(MemoryStore::new());
    let notifiers = Arc::new(NotifierRegistry::new());
    let labeler = Arc::new(OutcomeLabeler::new(
        store.clone(),
        store.clone(),
        notifiers.clone(),
        config.labeling_policy()?,
    ));
    let sentiment = Arc::new(SentimentAggregator::new(
        demo_sentiment_sources(),
        config.sentiment_settings(),
    ));
    // The channel outlives the single pass; nothing consumes it.
    let (alert_tx, _alert_rx) = mpsc::channel(8);

    let service = DetectionService::new(
        DetectionDeps {
            market: provider,
            detections: store.clone(),
            outcomes: store,
            sentiment,
            labeler,
            notifiers,
            models: Arc::new(ModelRegistry::new()),
            alert_tx,
        },
        fusion,
        engine,
        config.detection_settings(),
    );

    println!("Scanning {} ({mode} mode)", symbol);
    println!();

    match service.detect(&symbol, mode).await? {
        Some(detection) => print_detection(&detection),
        None => println!("No pattern completed on the current window."),
    }

    Ok(())
}

fn print_detection(detection: &PatternDetection) {
    println!(
        "✓ {} {}: {} ({})",
        detection.symbol, detection.timeframe, detection.pattern_name, detection.direction
    );
    println!();
    println!(
        "  Confidence: {:.2} ({})",
        detection.composite_confidence, detection.quality_tier
    );
    println!("  Entry:      {}", detection.entry_price.round_dp(4));
    println!("  Stop:       {}", detection.stop_loss.round_dp(4));
    println!("  Target:     {}", detection.take_profit.round_dp(4));
    let priority = if detection.low_priority {
        " (low priority)"
    } else {
        ""
    };
    println!("  R/R:        {:.2}{priority}", detection.risk_reward_ratio);
    println!();
    println!("  Layers:");
    for entry in &detection.explanation {
        println!("    {:<10} {:.2}  {}", entry.layer, entry.score, entry.summary);
    }
}
