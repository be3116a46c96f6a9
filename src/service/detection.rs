//! The shared detection pipeline.
//!
//! One call fetches a single bar snapshot per configured timeframe,
//! runs the rule and learned detectors on the primary (shortest)
//! timeframe, folds in timeframe agreement, sentiment, and pattern
//! history, and composes the result. Emitted detections are persisted
//! first; a detection that cannot be saved is never notified or
//! forwarded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::adapter::NotifierRegistry;
use crate::detector::{LearnedDetector, RuleBasedDetector};
use crate::domain::indicators::detect_regime;
use crate::domain::rules::RuleCatalog;
use crate::domain::{Bar, Direction, FusionMode, PatternDetection, Symbol, Timeframe};
use crate::error::{Error, Result};
use crate::fusion::{ConfidenceEngine, LayerInputs, TimeframeFusion, TimeframeScore};
use crate::learning::{ModelRegistry, OutcomeLabeler};
use crate::port::{
    DetectionEvent, DetectionStore, Event, MarketDataProvider, OutcomeStore,
};
use crate::service::SentimentAggregator;

/// Knobs for the pipeline.
#[derive(Debug, Clone)]
pub struct DetectionSettings {
    /// Bars requested per timeframe; windows below this are skipped.
    pub min_bars: usize,
    /// Budget for each market-data fetch.
    pub market_timeout: std::time::Duration,
    /// How far back the history layer reads outcomes.
    pub history_lookback_days: i64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            min_bars: 50,
            market_timeout: std::time::Duration::from_secs(10),
            history_lookback_days: 90,
        }
    }
}

/// Collaborators the pipeline is wired with.
pub struct DetectionDeps {
    pub market: Arc<dyn MarketDataProvider>,
    pub detections: Arc<dyn DetectionStore>,
    pub outcomes: Arc<dyn OutcomeStore>,
    pub sentiment: Arc<SentimentAggregator>,
    pub labeler: Arc<OutcomeLabeler>,
    pub notifiers: Arc<NotifierRegistry>,
    pub models: Arc<ModelRegistry>,
    pub alert_tx: mpsc::Sender<PatternDetection>,
}

/// Runs the full multi-layer pipeline for one symbol at a time.
///
/// Shared by the scan loop and on-demand calls; fresh bars seen on the
/// primary timeframe also advance the outcome labeler, each bar fed at
/// most once.
pub struct DetectionService {
    market: Arc<dyn MarketDataProvider>,
    detections: Arc<dyn DetectionStore>,
    outcomes: Arc<dyn OutcomeStore>,
    sentiment: Arc<SentimentAggregator>,
    labeler: Arc<OutcomeLabeler>,
    notifiers: Arc<NotifierRegistry>,
    alert_tx: mpsc::Sender<PatternDetection>,
    rules: RuleBasedDetector,
    learned: LearnedDetector,
    fusion: TimeframeFusion,
    engine: ConfidenceEngine,
    settings: DetectionSettings,
    bar_cursor: DashMap<Symbol, DateTime<Utc>>,
}

impl DetectionService {
    #[must_use]
    pub fn new(
        deps: DetectionDeps,
        fusion: TimeframeFusion,
        engine: ConfidenceEngine,
        settings: DetectionSettings,
    ) -> Self {
        Self {
            market: deps.market,
            detections: deps.detections,
            outcomes: deps.outcomes,
            sentiment: deps.sentiment,
            labeler: deps.labeler,
            notifiers: deps.notifiers,
            alert_tx: deps.alert_tx,
            rules: RuleBasedDetector::new(RuleCatalog::standard(), settings.min_bars),
            learned: LearnedDetector::new(deps.models),
            fusion,
            engine,
            settings,
            bar_cursor: DashMap::new(),
        }
    }

    /// Run the pipeline once for a symbol.
    ///
    /// `Ok(None)` when no rule matches at the primary timeframe or the
    /// window cannot frame a detection. Missing layers degrade the
    /// composite; only missing primary market data is an error.
    pub async fn detect(
        &self,
        symbol: &Symbol,
        mode: FusionMode,
    ) -> Result<Option<PatternDetection>> {
        let series = self.fetch_series(symbol).await?;
        let Some((primary_tf, primary_bars)) = series.first() else {
            debug!(%symbol, "no timeframes configured");
            return Ok(None);
        };

        self.feed_labeler(symbol, primary_bars).await;

        let Some(candidate) = self.rules.detect(primary_bars) else {
            return Ok(None);
        };
        debug!(
            %symbol,
            pattern = candidate.pattern_name,
            direction = %candidate.direction,
            "rule layer matched"
        );

        let learned = self.learned.score(primary_bars, candidate.pattern_name);

        let sign = match candidate.direction {
            Direction::Bullish => 1.0,
            Direction::Bearish => -1.0,
            Direction::Neutral => 0.0,
        };
        let per_tf: Vec<TimeframeScore> = series
            .iter()
            .map(|(tf, bars)| {
                let lean = self.rules.directional_score(bars);
                // Agreement with the candidate direction, in [0, 1]. A
                // neutral candidate has no side for anyone to agree with.
                let agreement = if sign == 0.0 {
                    0.5
                } else {
                    (lean * sign + 1.0) / 2.0
                };
                TimeframeScore::new(*tf, agreement)
            })
            .collect();
        let regime = match series.last() {
            Some((_, longest_bars)) => detect_regime(longest_bars),
            None => detect_regime(primary_bars),
        };
        let context = self.fusion.fuse(&per_tf, regime);

        let sentiment = match self.sentiment.snapshot(symbol).await {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                debug!(%symbol, %error, "sentiment layer unavailable for this pass");
                None
            }
        };

        let since = Utc::now() - chrono::Duration::days(self.settings.history_lookback_days);
        let history_win_rate = match self.outcomes.win_rate(candidate.pattern_name, since).await {
            Ok(rate) => rate,
            Err(error) => {
                warn!(%symbol, %error, "history layer lookup failed");
                None
            }
        };

        let inputs = LayerInputs {
            rule: candidate,
            learned,
            sentiment,
            context,
            history_win_rate,
        };
        let Some(detection) = self.engine.compose(symbol, *primary_tf, primary_bars, mode, inputs)
        else {
            debug!(%symbol, "window could not frame a detection");
            return Ok(None);
        };

        self.detections.save(&detection).await?;
        self.notifiers
            .notify_all(Event::DetectionEmitted(DetectionEvent::from(&detection)));
        self.labeler.track(&detection);
        if self.alert_tx.send(detection.clone()).await.is_err() {
            debug!("alert channel closed, detection not forwarded");
        }
        Ok(Some(detection))
    }

    /// One bar snapshot per configured timeframe, shortest first.
    ///
    /// The primary timeframe must deliver; secondary timeframes that
    /// fail, time out, or run short only lose their context
    /// contribution.
    async fn fetch_series(&self, symbol: &Symbol) -> Result<Vec<(Timeframe, Vec<Bar>)>> {
        let mut timeframes: Vec<Timeframe> = self.fusion.timeframes().to_vec();
        timeframes.sort_unstable();

        let mut series = Vec::with_capacity(timeframes.len());
        for (i, tf) in timeframes.iter().enumerate() {
            let is_primary = i == 0;
            let fetched = tokio::time::timeout(
                self.settings.market_timeout,
                self.market.get_bars(symbol, *tf, self.settings.min_bars),
            )
            .await;
            let bars = match fetched {
                Ok(Ok(bars)) => bars,
                Ok(Err(error)) => {
                    if is_primary {
                        return Err(error);
                    }
                    debug!(
                        %symbol,
                        timeframe = tf.as_str(),
                        %error,
                        "secondary timeframe unavailable"
                    );
                    continue;
                }
                Err(_) => {
                    if is_primary {
                        return Err(Error::DataUnavailable {
                            symbol: symbol.clone(),
                            timeframe: *tf,
                        });
                    }
                    debug!(
                        %symbol,
                        timeframe = tf.as_str(),
                        "secondary timeframe fetch timed out"
                    );
                    continue;
                }
            };
            if bars.len() < self.settings.min_bars {
                if is_primary {
                    return Err(Error::DataUnavailable {
                        symbol: symbol.clone(),
                        timeframe: *tf,
                    });
                }
                debug!(
                    %symbol,
                    timeframe = tf.as_str(),
                    bars = bars.len(),
                    "secondary timeframe history too short"
                );
                continue;
            }
            series.push((*tf, bars));
        }
        Ok(series)
    }

    /// Forward primary-timeframe bars the labeler has not seen yet.
    ///
    /// The first snapshot for a symbol only sets the cursor; history
    /// predating any tracked position has nothing to advance.
    async fn feed_labeler(&self, symbol: &Symbol, bars: &[Bar]) {
        let Some(last) = bars.last() else {
            return;
        };
        let cursor = self.bar_cursor.get(symbol).map(|entry| *entry);
        match cursor {
            None => {
                self.bar_cursor.insert(symbol.clone(), last.timestamp);
            }
            Some(cursor) => {
                for bar in bars.iter().filter(|bar| bar.timestamp > cursor) {
                    self.labeler.on_bar(bar).await;
                }
                if last.timestamp > cursor {
                    self.bar_cursor.insert(symbol.clone(), last.timestamp);
                }
            }
        }
    }
}
