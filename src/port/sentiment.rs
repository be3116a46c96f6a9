//! Sentiment source port.

use async_trait::async_trait;

use crate::domain::{SourceKind, SourceReading, Symbol};
use crate::error::Result;

/// One external sentiment feed (news wire, social firehose, market
/// internals).
///
/// Sources are polled by the sentiment aggregator; a failing source is
/// skipped for the cycle, never fatal.
#[async_trait]
pub trait SentimentSource: Send + Sync {
    /// Which aggregation bucket this source feeds.
    fn kind(&self) -> SourceKind;

    /// Get the source name for logging/debugging.
    fn source_name(&self) -> &'static str;

    /// Fetch the current reading for a symbol.
    async fn fetch(&self, symbol: &Symbol) -> Result<SourceReading>;
}
