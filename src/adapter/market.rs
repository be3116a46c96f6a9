//! Market data adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::domain::{Bar, Symbol, Timeframe};
use crate::error::{Error, Result};
use crate::port::MarketDataProvider;

/// A provider that serves preloaded bar series.
///
/// Used for tests and offline replay runs. Series are keyed by symbol
/// and timeframe; asking for an unloaded pair is an error, matching a
/// live provider that has no data for an instrument.
pub struct ReplayProvider {
    series: RwLock<HashMap<(Symbol, Timeframe), Vec<Bar>>>,
}

impl ReplayProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
        }
    }

    /// Load (or replace) the bar series for a symbol and timeframe.
    pub fn load(&self, symbol: Symbol, timeframe: Timeframe, bars: Vec<Bar>) {
        self.series.write().insert((symbol, timeframe), bars);
    }

    /// Append one bar to an existing series, creating it if absent.
    ///
    /// Lets replay tests advance the tape between scan cycles.
    pub fn push(&self, bar: Bar) {
        let key = (bar.symbol.clone(), bar.timeframe);
        self.series.write().entry(key).or_default().push(bar);
    }
}

impl Default for ReplayProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic random-walk series for offline runs.
///
/// The seed is derived from the symbol and timeframe, so the same pair
/// replays the same tape across restarts. Prices stay in exact decimal
/// arithmetic; each step drifts by a signed basis-point amount.
#[must_use]
pub fn synthetic_series(symbol: &Symbol, timeframe: Timeframe, count: usize) -> Vec<Bar> {
    let seed = symbol
        .as_str()
        .bytes()
        .fold(u64::from(timeframe.duration().num_minutes() as u32), |acc, byte| {
            acc.wrapping_mul(31).wrapping_add(u64::from(byte))
        });
    let mut rng = StdRng::seed_from_u64(seed);

    let start = Utc::now() - timeframe.duration() * count as i32;
    let mut close = Decimal::from(100);
    let mut bars = Vec::with_capacity(count);
    for i in 0..count {
        let drift_bp: i64 = rng.gen_range(-60..=60);
        let wick_bp: i64 = rng.gen_range(5..=25);
        let open = close;
        close = open * (Decimal::ONE + Decimal::new(drift_bp, 4));
        let high = open.max(close) * (Decimal::ONE + Decimal::new(wick_bp, 4));
        let low = open.min(close) * (Decimal::ONE - Decimal::new(wick_bp, 4));
        bars.push(Bar {
            symbol: symbol.clone(),
            timeframe,
            open,
            high,
            low,
            close,
            volume: Decimal::from(rng.gen_range(500_i64..=1500)),
            timestamp: start + timeframe.duration() * i as i32,
        });
    }
    bars
}

#[async_trait]
impl MarketDataProvider for ReplayProvider {
    async fn get_bars(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        lookback: usize,
    ) -> Result<Vec<Bar>> {
        let series = self.series.read();
        let bars = series
            .get(&(symbol.clone(), timeframe))
            .ok_or_else(|| Error::DataUnavailable {
                symbol: symbol.clone(),
                timeframe,
            })?;
        let start = bars.len().saturating_sub(lookback);
        Ok(bars[start..].to_vec())
    }

    fn provider_name(&self) -> &'static str {
        "replay"
    }
}
