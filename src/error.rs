use thiserror::Error;

use crate::domain::{Layer, Symbol, Timeframe};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Model training errors with structured variants.
#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("insufficient training data: {got} labeled outcomes, need {need}")]
    InsufficientData { got: usize, need: usize },

    #[error("candidate rejected: AUC {candidate:.4} does not beat max({floor:.2}, active {active:.4})")]
    ModelRejected {
        candidate: f64,
        active: f64,
        floor: f64,
    },

    #[error("feature width mismatch: sample has {got} features, model expects {expected}")]
    FeatureWidthMismatch { got: usize, expected: usize },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error("market data unavailable for {symbol} {timeframe}")]
    DataUnavailable { symbol: Symbol, timeframe: Timeframe },

    #[error("{layer} layer unavailable: {reason}")]
    LayerUnavailable { layer: Layer, reason: String },

    #[error("persistence failure during {operation}: {reason}")]
    PersistenceFailure { operation: &'static str, reason: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
