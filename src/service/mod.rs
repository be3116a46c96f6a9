//! Long-running services: the scan loop, the shared detection
//! pipeline, sentiment aggregation, and alerting.

mod alerts;
mod detection;
mod scanner;
mod sentiment;

pub use alerts::{spawn_alert_task, AlertDecision, AlertGenerator, AlertSettings};
pub use detection::{DetectionDeps, DetectionService, DetectionSettings};
pub use scanner::{
    run_scan_cycle, MarketScanner, MarketScannerHandle, ScanReport, ScannerConfig,
};
pub use sentiment::{SentimentAggregator, SentimentSettings};
