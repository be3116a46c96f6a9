//! Application layer - orchestration and configuration.

mod config;
mod orchestrator;

pub use config::{
    AlertsSection, Config, FusionSection, LearningSection, LoggingSection, ScannerSection,
    SentimentSection, WeightTable,
};
pub use orchestrator::App;

pub(crate) use orchestrator::{demo_sentiment_sources, seed_replay_provider};
