//! Handler for the `run` command.

use crate::app::{App, Config};
use crate::cli::RunArgs;
use crate::error::Result;
use tokio::signal;
use tracing::{error, info};

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;

    // Apply CLI overrides
    if let Some(ref mode) = args.mode {
        config.fusion.mode = mode.clone();
    }
    if let Some(ref watchlist) = args.watchlist {
        config.scanner.watchlist = watchlist
            .split(',')
            .map(|symbol| symbol.trim().to_string())
            .filter(|symbol| !symbol.is_empty())
            .collect();
    }
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }

    config.init_logging();

    info!(
        mode = %config.fusion.mode,
        watchlist = ?config.scanner.watchlist,
        "chartist starting"
    );

    tokio::select! {
        result = App::run(config) => {
            if let Err(e) = result {
                error!(error = %e, "Fatal error");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("chartist stopped");
    Ok(())
}
