//! The two leaf detectors feeding the fusion engine.
//!
//! `RuleBasedDetector` runs the deterministic candle-rule catalog;
//! `LearnedDetector` scores the same window with the active logistic
//! model. Both degrade to "no signal" rather than erroring, so the
//! confidence engine can redistribute their weight.

mod features;
mod learned;
mod rule_based;

pub use features::{FeatureVector, FEATURE_COUNT};
pub use learned::{LearnedDetector, LearnedScore};
pub use rule_based::{RuleBasedDetection, RuleBasedDetector};

/// Default minimum bars of history a detection window must carry.
pub const MIN_WINDOW: usize = 50;
