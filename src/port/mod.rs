//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports define the extension points in the hexagonal architecture.
//! They are traits that adapters implement to integrate with external
//! systems (market data feeds, sentiment feeds, storage, notifiers).
//!
//! # Available Ports
//!
//! - [`MarketDataProvider`] - OHLCV candle history
//! - [`SentimentSource`] - One external sentiment feed
//! - [`DetectionStore`], [`OutcomeStore`], [`ModelStore`], [`AlertStore`] - Persistence
//! - [`Notifier`] - Event notifications (logging, webhooks, etc.)

mod market_data;
mod notifier;
mod sentiment;
mod store;

pub use market_data::MarketDataProvider;

pub use notifier::{
    AlertEvent, DetectionEvent, Event, Notifier, OutcomeEvent, PromotionEvent, ScanSummaryEvent,
};

pub use sentiment::SentimentSource;

pub use store::{AlertStore, DetectionStore, ModelStore, OutcomeStore};
