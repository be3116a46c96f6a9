//! Deterministic bar-series builders for tests.
//!
//! Provides a chainable [`BarSeriesBuilder`] with trend, range, and
//! random-walk generators so tests describe the market shape they need
//! rather than hand-rolling candle arithmetic.

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{Bar, Symbol, Timeframe};

/// Create a single bar with the given OHLCV on the builder defaults.
pub fn bar(
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
) -> Bar {
    Bar {
        symbol: Symbol::new("BTC-USD"),
        timeframe: Timeframe::H1,
        open,
        high,
        low,
        close,
        volume,
        timestamp: Utc::now(),
    }
}

/// Builder for synthetic but structurally valid candle series.
///
/// Every generated series keeps `open[i] == close[i-1]`, monotonically
/// increasing timestamps one timeframe apart, and highs/lows that
/// envelope the body.
#[derive(Debug, Clone)]
pub struct BarSeriesBuilder {
    symbol: Symbol,
    timeframe: Timeframe,
    start_price: Decimal,
    volume: Decimal,
    start_time: DateTime<Utc>,
    seed: u64,
}

impl BarSeriesBuilder {
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: Symbol::new(symbol),
            timeframe: Timeframe::H1,
            start_price: dec!(100),
            volume: dec!(1000),
            start_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            seed: 42,
        }
    }

    #[must_use]
    pub fn timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    #[must_use]
    pub fn start_price(mut self, price: Decimal) -> Self {
        self.start_price = price;
        self
    }

    #[must_use]
    pub fn volume(mut self, volume: Decimal) -> Self {
        self.volume = volume;
        self
    }

    #[must_use]
    pub fn start_time(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = start;
        self
    }

    /// Seed for the random-walk generator.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Directional series: each close moves by `step` from the last.
    ///
    /// A negative `step` builds a downtrend.
    #[must_use]
    pub fn trend(&self, count: usize, step: Decimal) -> Vec<Bar> {
        let wick = step.abs() / dec!(4) + dec!(0.01);
        self.series(count, |i, _| {
            let open = self.start_price + step * Decimal::from(i as i64);
            (open, open + step, wick)
        })
    }

    /// Sideways series oscillating `half_width` around the start price.
    #[must_use]
    pub fn range(&self, count: usize, half_width: Decimal) -> Vec<Bar> {
        let wick = half_width / dec!(4) + dec!(0.01);
        self.series(count, |i, _| {
            let (open, close) = if i % 2 == 0 {
                (self.start_price - half_width, self.start_price + half_width)
            } else {
                (self.start_price + half_width, self.start_price - half_width)
            };
            (open, close, wick)
        })
    }

    /// Seeded random walk with steps up to `max_step_bp` basis points.
    #[must_use]
    pub fn random_walk(&self, count: usize, max_step_bp: i64) -> Vec<Bar> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut close = self.start_price;
        let mut bars = Vec::with_capacity(count);
        for i in 0..count {
            let drift = Decimal::new(rng.gen_range(-max_step_bp..=max_step_bp), 4);
            let wick = Decimal::new(rng.gen_range(5..=25), 4);
            let open = close;
            close = open * (Decimal::ONE + drift);
            bars.push(Bar {
                symbol: self.symbol.clone(),
                timeframe: self.timeframe,
                open,
                high: open.max(close) * (Decimal::ONE + wick),
                low: open.min(close) * (Decimal::ONE - wick),
                close,
                volume: self.volume,
                timestamp: self.start_time + self.timeframe.duration() * i as i32,
            });
        }
        bars
    }

    fn series<F>(&self, count: usize, shape: F) -> Vec<Bar>
    where
        F: Fn(usize, Decimal) -> (Decimal, Decimal, Decimal),
    {
        (0..count)
            .map(|i| {
                let (open, close, wick) = shape(i, self.start_price);
                Bar {
                    symbol: self.symbol.clone(),
                    timeframe: self.timeframe,
                    open,
                    high: open.max(close) + wick,
                    low: open.min(close) - wick,
                    close,
                    volume: self.volume,
                    timestamp: self.start_time + self.timeframe.duration() * i as i32,
                }
            })
            .collect()
    }
}
