//! Exchange-agnostic domain logic.

mod alert;
mod bar;
mod detection;
mod id;
mod model;
mod outcome;
mod sentiment;

pub mod indicators;
pub mod rules;

// Core domain types
pub use bar::{Bar, CandleExt, Direction, Timeframe};
pub use id::{AlertId, DetectionId, OutcomeId, Symbol, VersionId};

// Detections and their quality grading
pub use detection::{FusionMode, Layer, LayerExplanation, PatternDetection, QualityTier};

// Sentiment
pub use sentiment::{SentimentSnapshot, SourceKind, SourceReading};

// Outcome labeling
pub use outcome::{LabelingPolicy, Outcome, PaperPosition, PositionExit};

// Learned models
pub use model::{sigmoid, ModelNamespace, ModelVersion};

// Alerting
pub use alert::{Alert, DedupKey};
