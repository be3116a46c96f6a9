use chartist::adapter::ReplayProvider;
use chartist::domain::{Bar, Symbol, Timeframe};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn candle(
    symbol: &str,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
    at: DateTime<Utc>,
) -> Bar {
    Bar {
        symbol: Symbol::new(symbol),
        timeframe: Timeframe::H1,
        open,
        high,
        low,
        close,
        volume,
        timestamp: at,
    }
}

fn downtrend(symbol: &str, count: usize, start: DateTime<Utc>) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = dec!(130) - Decimal::from(i);
            candle(
                symbol,
                close + dec!(1),
                close + dec!(1.5),
                close - dec!(0.5),
                close,
                dec!(100),
                start + Duration::hours(i as i64),
            )
        })
        .collect()
}

/// Downtrend closing on a high-volume bullish engulfing pair.
pub fn engulfing_window(symbol: &str) -> Vec<Bar> {
    let start = Utc::now() - Duration::hours(65);
    let mut bars = downtrend(symbol, 55, start);
    bars.push(candle(
        symbol,
        dec!(76),
        dec!(77),
        dec!(73.5),
        dec!(74),
        dec!(100),
        start + Duration::hours(55),
    ));
    bars.push(candle(
        symbol,
        dec!(73.8),
        dec!(79),
        dec!(73.5),
        dec!(78.5),
        dec!(250),
        start + Duration::hours(56),
    ));
    bars
}

/// Steady drift with uniform candles; no single- or multi-bar shape
/// completes on it.
pub fn quiet_window(symbol: &str) -> Vec<Bar> {
    downtrend(symbol, 60, Utc::now() - Duration::hours(68))
}

/// Load the same window on every fused timeframe of the standard
/// H1/H4/D1 stack.
pub fn load_standard_timeframes(provider: &ReplayProvider, symbol: &str, window: &[Bar]) {
    for timeframe in [Timeframe::H1, Timeframe::H4, Timeframe::D1] {
        let retimed: Vec<Bar> = window
            .iter()
            .cloned()
            .map(|mut bar| {
                bar.timeframe = timeframe;
                bar
            })
            .collect();
        provider.load(Symbol::new(symbol), timeframe, retimed);
    }
}
