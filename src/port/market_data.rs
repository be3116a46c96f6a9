//! Market data port for candle history.

use async_trait::async_trait;

use crate::domain::{Bar, Symbol, Timeframe};
use crate::error::Result;

/// Fetches OHLCV candle history for a symbol.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - Returned bars must be closed bars, ordered oldest to newest
/// - A provider that has no data for the pair should return
///   [`Error::DataUnavailable`](crate::error::Error::DataUnavailable)
///   rather than an empty window
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch up to `lookback` most recent closed bars, oldest first.
    async fn get_bars(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        lookback: usize,
    ) -> Result<Vec<Bar>>;

    /// Get the provider name for logging/debugging.
    fn provider_name(&self) -> &'static str;
}
