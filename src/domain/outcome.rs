//! Labeled outcomes and the paper positions that produce them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bar::{Bar, Direction};
use super::detection::PatternDetection;
use super::id::{DetectionId, OutcomeId, Symbol};

/// How a tracked position gets labeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum LabelingPolicy {
    /// Close on whichever of stop or target is touched first, with a
    /// hard cutoff at `max_bars` bars held (closed at that bar's close).
    StopOrTarget { max_bars: usize },
    /// Close at the close of the Nth bar after entry regardless of
    /// stop or target.
    FixedHorizon { bars: usize },
}

/// Realized result of one closed position. Append-only, never updated.
///
/// `detection_id` is a weak reference for lookup; the outcome does not
/// own the detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub id: OutcomeId,
    pub detection_id: DetectionId,
    pub symbol: Symbol,
    pub pattern_name: String,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    /// Signed PnL per unit, positive for a win in either direction.
    pub pnl: Decimal,
    pub win: bool,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub labeling_policy: LabelingPolicy,
}

/// A simulated position opened from an emitted detection.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperPosition {
    pub detection_id: DetectionId,
    pub symbol: Symbol,
    pub pattern_name: String,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub opened_at: DateTime<Utc>,
    pub bars_held: usize,
    pub policy: LabelingPolicy,
    pub closed: bool,
}

/// Exit decided by advancing a position over one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionExit {
    pub price: Decimal,
    pub at: DateTime<Utc>,
}

impl PaperPosition {
    /// Open a simulated position mirroring a detection's risk frame.
    #[must_use]
    pub fn open(detection: &PatternDetection, policy: LabelingPolicy) -> Self {
        Self {
            detection_id: detection.id.clone(),
            symbol: detection.symbol.clone(),
            pattern_name: detection.pattern_name.clone(),
            direction: detection.direction,
            entry_price: detection.entry_price,
            stop_loss: detection.stop_loss,
            take_profit: detection.take_profit,
            opened_at: detection.created_at,
            bars_held: 0,
            policy,
            closed: false,
        }
    }

    /// Advance the position over `bar` and return the exit if it closes.
    ///
    /// Bars at or before the opening timestamp are ignored so re-feeding
    /// the entry bar cannot close a position. When both stop and target
    /// sit inside one bar's range the stop fills: intrabar ordering is
    /// unknowable from OHLC, so labels take the adverse fill.
    pub fn advance(&mut self, bar: &Bar) -> Option<PositionExit> {
        if self.closed || bar.timestamp <= self.opened_at {
            return None;
        }
        self.bars_held += 1;

        let exit_price = match self.policy {
            LabelingPolicy::StopOrTarget { max_bars } => {
                let touched = match self.direction {
                    Direction::Bullish => {
                        if bar.low <= self.stop_loss {
                            Some(self.stop_loss)
                        } else if bar.high >= self.take_profit {
                            Some(self.take_profit)
                        } else {
                            None
                        }
                    }
                    Direction::Bearish => {
                        if bar.high >= self.stop_loss {
                            Some(self.stop_loss)
                        } else if bar.low <= self.take_profit {
                            Some(self.take_profit)
                        } else {
                            None
                        }
                    }
                    Direction::Neutral => None,
                };
                match touched {
                    Some(price) => Some(price),
                    None if self.bars_held >= max_bars => Some(bar.close),
                    None => None,
                }
            }
            LabelingPolicy::FixedHorizon { bars } => {
                if self.bars_held >= bars {
                    Some(bar.close)
                } else {
                    None
                }
            }
        };

        exit_price.map(|price| {
            self.closed = true;
            PositionExit {
                price,
                at: bar.timestamp,
            }
        })
    }

    /// Build the append-only outcome record for a decided exit.
    #[must_use]
    pub fn into_outcome(self, exit: PositionExit) -> Outcome {
        let pnl = match self.direction {
            Direction::Bearish => self.entry_price - exit.price,
            _ => exit.price - self.entry_price,
        };
        Outcome {
            id: OutcomeId::new(),
            detection_id: self.detection_id,
            symbol: self.symbol,
            pattern_name: self.pattern_name,
            entry_price: self.entry_price,
            exit_price: exit.price,
            pnl,
            win: pnl > Decimal::ZERO,
            opened_at: self.opened_at,
            closed_at: exit.at,
            labeling_policy: self.policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timeframe;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn position(direction: Direction, policy: LabelingPolicy) -> PaperPosition {
        PaperPosition {
            detection_id: DetectionId::new(),
            symbol: Symbol::new("BTC-USD"),
            pattern_name: "hammer".into(),
            direction,
            entry_price: dec!(100),
            stop_loss: if direction == Direction::Bullish {
                dec!(95)
            } else {
                dec!(105)
            },
            take_profit: if direction == Direction::Bullish {
                dec!(110)
            } else {
                dec!(90)
            },
            opened_at: Utc::now(),
            bars_held: 0,
            policy,
            closed: false,
        }
    }

    fn bar_after(pos: &PaperPosition, high: Decimal, low: Decimal, close: Decimal) -> Bar {
        Bar {
            symbol: pos.symbol.clone(),
            timeframe: Timeframe::H1,
            open: close,
            high,
            low,
            close,
            volume: dec!(100),
            timestamp: pos.opened_at + Duration::hours(i64::try_from(pos.bars_held).unwrap() + 1),
        }
    }

    #[test]
    fn bullish_stop_touch_closes_at_stop() {
        let mut pos = position(Direction::Bullish, LabelingPolicy::StopOrTarget { max_bars: 10 });
        let bar = bar_after(&pos, dec!(101), dec!(94), dec!(96));
        let exit = pos.advance(&bar).unwrap();
        assert_eq!(exit.price, dec!(95));
        assert!(pos.closed);
    }

    #[test]
    fn bullish_target_touch_closes_at_target() {
        let mut pos = position(Direction::Bullish, LabelingPolicy::StopOrTarget { max_bars: 10 });
        let bar = bar_after(&pos, dec!(111), dec!(99), dec!(109));
        let exit = pos.advance(&bar).unwrap();
        assert_eq!(exit.price, dec!(110));
    }

    #[test]
    fn same_bar_stop_and_target_resolves_to_stop() {
        let mut pos = position(Direction::Bullish, LabelingPolicy::StopOrTarget { max_bars: 10 });
        let bar = bar_after(&pos, dec!(115), dec!(90), dec!(100));
        let exit = pos.advance(&bar).unwrap();
        assert_eq!(exit.price, dec!(95));
    }

    #[test]
    fn bearish_stop_is_above_entry() {
        let mut pos = position(Direction::Bearish, LabelingPolicy::StopOrTarget { max_bars: 10 });
        let bar = bar_after(&pos, dec!(106), dec!(99), dec!(104));
        let exit = pos.advance(&bar).unwrap();
        assert_eq!(exit.price, dec!(105));
    }

    #[test]
    fn max_bars_cutoff_closes_at_close() {
        let mut pos = position(Direction::Bullish, LabelingPolicy::StopOrTarget { max_bars: 2 });
        assert!(pos.advance(&bar_after(&pos, dec!(102), dec!(98), dec!(101))).is_none());
        let exit = pos
            .advance(&bar_after(&pos, dec!(103), dec!(99), dec!(102)))
            .unwrap();
        assert_eq!(exit.price, dec!(102));
    }

    #[test]
    fn fixed_horizon_ignores_stop_and_target() {
        let mut pos = position(Direction::Bullish, LabelingPolicy::FixedHorizon { bars: 2 });
        // Stop is touched on the first bar but the horizon policy holds.
        assert!(pos.advance(&bar_after(&pos, dec!(101), dec!(90), dec!(98))).is_none());
        let exit = pos
            .advance(&bar_after(&pos, dec!(104), dec!(97), dec!(103)))
            .unwrap();
        assert_eq!(exit.price, dec!(103));
    }

    #[test]
    fn closed_position_does_not_advance() {
        let mut pos = position(Direction::Bullish, LabelingPolicy::StopOrTarget { max_bars: 10 });
        let bar = bar_after(&pos, dec!(101), dec!(94), dec!(96));
        assert!(pos.advance(&bar).is_some());
        let again = bar_after(&pos, dec!(101), dec!(90), dec!(96));
        assert!(pos.advance(&again).is_none());
    }

    #[test]
    fn entry_bar_is_ignored() {
        let mut pos = position(Direction::Bullish, LabelingPolicy::StopOrTarget { max_bars: 10 });
        let mut bar = bar_after(&pos, dec!(101), dec!(90), dec!(96));
        bar.timestamp = pos.opened_at;
        assert!(pos.advance(&bar).is_none());
        assert_eq!(pos.bars_held, 0);
    }

    #[test]
    fn bearish_outcome_pnl_is_entry_minus_exit() {
        let pos = position(Direction::Bearish, LabelingPolicy::StopOrTarget { max_bars: 10 });
        let opened_at = pos.opened_at;
        let outcome = pos.into_outcome(PositionExit {
            price: dec!(90),
            at: opened_at + Duration::hours(3),
        });
        assert_eq!(outcome.pnl, dec!(10));
        assert!(outcome.win);
    }

    #[test]
    fn losing_outcome_is_not_a_win() {
        let pos = position(Direction::Bullish, LabelingPolicy::StopOrTarget { max_bars: 10 });
        let opened_at = pos.opened_at;
        let outcome = pos.into_outcome(PositionExit {
            price: dec!(95),
            at: opened_at + Duration::hours(1),
        });
        assert_eq!(outcome.pnl, dec!(-5));
        assert!(!outcome.win);
    }
}
