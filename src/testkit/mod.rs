//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`bars`] — [`BarSeriesBuilder`](bars::BarSeriesBuilder) and quick
//!   bar factories for deterministic price series.
//! - [`config`] — Canonical test configurations (trainer, alerts,
//!   sentiment, fusion) so test modules share one set of defaults.
//!
//! Scripted adapters live with the real ones: see
//! [`ReplayProvider`](crate::adapter::ReplayProvider),
//! [`StaticSource`](crate::adapter::StaticSource), and
//! [`FlakySource`](crate::adapter::FlakySource).

pub mod bars;
pub mod config;
