//! The watchlist scan loop.
//!
//! Every interval the scanner runs the detection pipeline once per
//! watchlist symbol. Symbols fail independently; a cycle always
//! finishes and reports what it saw.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::adapter::NotifierRegistry;
use crate::domain::{FusionMode, Symbol};
use crate::error::Error;
use crate::port::{Event, ScanSummaryEvent};
use crate::service::DetectionService;

/// Knobs for the scan loop.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Time between scan cycles.
    pub interval: Duration,
    pub watchlist: Vec<Symbol>,
    pub mode: FusionMode,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(120),
            watchlist: vec![],
            mode: FusionMode::default(),
        }
    }
}

/// Summary of one scan cycle.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub symbols_scanned: usize,
    pub detections_emitted: usize,
    pub symbols_failed: usize,
}

/// Run one pass over the watchlist.
///
/// Per-symbol errors are logged and counted, never propagated; a
/// symbol with no data is skipped for the cycle.
pub async fn run_scan_cycle(
    service: &DetectionService,
    watchlist: &[Symbol],
    mode: FusionMode,
    notifiers: &NotifierRegistry,
) -> ScanReport {
    let mut detections_emitted = 0;
    let mut symbols_failed = 0;
    for symbol in watchlist {
        match service.detect(symbol, mode).await {
            Ok(Some(detection)) => {
                debug!(
                    %symbol,
                    pattern = %detection.pattern_name,
                    tier = ?detection.quality_tier,
                    "scan emitted a detection"
                );
                detections_emitted += 1;
            }
            Ok(None) => {}
            Err(Error::DataUnavailable { timeframe, .. }) => {
                debug!(%symbol, timeframe = timeframe.as_str(), "no market data, symbol skipped");
                symbols_failed += 1;
            }
            Err(error) => {
                warn!(%symbol, %error, "scan failed for symbol");
                symbols_failed += 1;
            }
        }
    }

    let report = ScanReport {
        symbols_scanned: watchlist.len(),
        detections_emitted,
        symbols_failed,
    };
    notifiers.notify_all(Event::ScanCompleted(ScanSummaryEvent {
        symbols_scanned: report.symbols_scanned,
        detections_emitted: report.detections_emitted,
        symbols_failed: report.symbols_failed,
    }));
    report
}

/// Handle to control the scanner.
pub struct MarketScannerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl MarketScannerHandle {
    /// Signal the scanner to shut down gracefully.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Interval loop that scans the watchlist through the shared pipeline.
pub struct MarketScanner {
    service: Arc<DetectionService>,
    notifiers: Arc<NotifierRegistry>,
    config: ScannerConfig,
}

impl MarketScanner {
    pub fn new(
        service: Arc<DetectionService>,
        notifiers: Arc<NotifierRegistry>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            service,
            notifiers,
            config,
        }
    }

    /// Start the scan loop.
    ///
    /// The first cycle runs immediately; after that the configured
    /// interval paces the loop. Returns a handle to control the
    /// scanner and a receiver for per-cycle reports.
    pub fn start(self) -> (MarketScannerHandle, mpsc::Receiver<ScanReport>) {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (report_tx, report_rx) = mpsc::channel::<ScanReport>(16);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(self.config.interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("market scanner shutting down");
                        break;
                    }
                    _ = interval_timer.tick() => {
                        let report = run_scan_cycle(
                            &self.service,
                            &self.config.watchlist,
                            self.config.mode,
                            &self.notifiers,
                        )
                        .await;
                        info!(
                            scanned = report.symbols_scanned,
                            emitted = report.detections_emitted,
                            failed = report.symbols_failed,
                            "scan cycle complete"
                        );
                        if report_tx.send(report).await.is_err() {
                            debug!("scan report receiver dropped");
                            break;
                        }
                    }
                }
            }
        });

        (MarketScannerHandle { shutdown_tx }, report_rx)
    }
}
