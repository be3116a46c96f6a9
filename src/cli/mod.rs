//! Command-line interface definitions.

pub mod check;
pub mod run;
pub mod scan;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chartist - multi-layer candlestick pattern scanner.
#[derive(Parser, Debug)]
#[command(name = "chartist")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scanner (foreground, interactive)
    Run(RunArgs),

    /// Detect patterns for one symbol and print the result
    Scan(ScanArgs),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Subcommands for `chartist check`
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration file
    Config(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override fusion mode (conservative, aggressive)
    #[arg(long)]
    pub mode: Option<String>,

    /// Comma-separated watchlist override
    #[arg(long)]
    pub watchlist: Option<String>,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,
}

/// Arguments for the `scan` subcommand.
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Symbol to scan (e.g. BTC-USD)
    pub symbol: String,

    /// Path to configuration file; defaults are used when absent
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override fusion mode (conservative, aggressive)
    #[arg(long)]
    pub mode: Option<String>,
}
