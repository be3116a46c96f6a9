//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.
//! Avoids each test module defining its own slightly-different defaults.

use std::time::Duration;

use crate::domain::Timeframe;
use crate::fusion::TimeframeFusion;
use crate::learning::{RetrainConfig, TrainerConfig};
use crate::service::{AlertSettings, DetectionSettings, SentimentSettings};

/// Small, seeded trainer config so fits converge fast and repeatably.
#[must_use]
pub fn trainer() -> TrainerConfig {
    TrainerConfig {
        min_samples: 10,
        metric_floor: 0.55,
        epochs: 80,
        learning_rate: 0.2,
        holdout_fraction: 0.2,
        seed: Some(7),
    }
}

/// Retrain config with the given tick interval and the test trainer.
#[must_use]
pub fn retrain(interval: Duration) -> RetrainConfig {
    RetrainConfig {
        interval,
        trainer: trainer(),
    }
}

/// Sentiment settings with a short source timeout — no waiting in tests.
#[must_use]
pub fn sentiment() -> SentimentSettings {
    SentimentSettings {
        source_timeout: Duration::from_millis(200),
        ..SentimentSettings::default()
    }
}

/// Alert settings with a sub-second cooldown window.
#[must_use]
pub fn alerts() -> AlertSettings {
    AlertSettings {
        threshold: 0.8,
        cooldown: Duration::from_millis(100),
    }
}

/// Single-timeframe fusion: one hourly weight, no divergence surprises.
#[must_use]
pub fn single_timeframe_fusion() -> TimeframeFusion {
    TimeframeFusion::new(vec![Timeframe::H1], vec![1.0], vec![1.0], 0.5)
}

/// Default three-timeframe fusion as the shipped configuration wires it.
#[must_use]
pub fn standard_fusion() -> TimeframeFusion {
    TimeframeFusion::new(
        vec![Timeframe::H1, Timeframe::H4, Timeframe::D1],
        vec![0.25, 0.35, 0.40],
        vec![0.40, 0.35, 0.25],
        0.5,
    )
}

/// Detection settings with a short market-data timeout.
#[must_use]
pub fn detection() -> DetectionSettings {
    DetectionSettings {
        market_timeout: Duration::from_millis(500),
        ..DetectionSettings::default()
    }
}
