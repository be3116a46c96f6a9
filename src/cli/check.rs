//! Handlers for the `check` diagnostic commands.

use std::path::Path;

use crate::app::Config;
use crate::error::Result;

/// Validate configuration file without starting the scanner.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    println!("Checking configuration: {}", path.display());
    println!();

    match Config::load(path) {
        Ok(config) => {
            println!("✓ Configuration file is valid");
            println!();
            println!("Summary:");
            println!("  Mode:       {}", config.fusion.mode);
            println!("  Watchlist:  {}", config.scanner.watchlist.join(", "));
            println!("  Timeframes: {}", config.scanner.timeframes.join(", "));
            println!("  Scan every: {}s", config.scanner.interval_seconds);
            println!(
                "  Alerts:     threshold {:.2}, cooldown {}s",
                config.alerts.threshold, config.alerts.cooldown_seconds
            );
            println!(
                "  Retrain:    every {}s, min {} samples, AUC floor {:.2}",
                config.learning.retrain_interval_seconds,
                config.learning.min_samples,
                config.learning.metric_floor
            );
            Ok(())
        }
        Err(e) => {
            println!("✗ Configuration invalid");
            println!("  {e}");
            Err(e)
        }
    }
}
