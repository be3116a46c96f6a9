//! Chartist - multi-layer candlestick pattern detection and signal fusion.
//!
//! This crate scans market candle series for classical chart patterns,
//! scores each candidate through several independent layers, and fuses
//! the layer scores into one graded, risk-framed detection.
//!
//! # Architecture
//!
//! Detection is a pipeline of scoring layers over a shared bar window:
//!
//! - **`domain::rules`** - Deterministic candle-shape rules
//!   - 22 single-, two-, and three-bar patterns in a [`RuleCatalog`](domain::rules::RuleCatalog)
//! - **`detector`** - Rule-based and learned (logistic) detectors over
//!   a fixed feature extraction
//! - **`fusion`** - Timeframe agreement plus the composite confidence
//!   engine that grades and risk-frames a detection
//! - **`learning`** - Outcome labeling, periodic retraining, and
//!   lock-free model promotion
//! - **`service`** - The scan loop, sentiment aggregation, and alert
//!   generation that tie the layers together
//!
//! # Modules
//!
//! - [`domain`] - Bars, detections, outcomes, sentiment, ids
//! - [`port`] - Trait seams for market data, sentiment, stores, events
//! - [`adapter`] - In-memory and replay implementations of the ports
//! - [`detector`] - Pattern detectors over a bar window
//! - [`fusion`] - Timeframe fusion and composite confidence
//! - [`learning`] - Labeling, training, registry, retrain scheduler
//! - [`service`] - Detection pipeline, scanner, sentiment, alerts
//! - [`app`] - Configuration loading and orchestration
//! - [`cli`] - Command-line interface
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `testkit` - Expose shared test builders to integration tests
//!
//! # Example
//!
//! ```no_run
//! use chartist::detector::RuleBasedDetector;
//! use chartist::domain::rules::RuleCatalog;
//!
//! let detector = RuleBasedDetector::new(RuleCatalog::standard(), 50);
//! ```

pub mod adapter;
pub mod app;
pub mod cli;
pub mod detector;
pub mod domain;
pub mod error;
pub mod fusion;
pub mod learning;
pub mod port;
pub mod service;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
