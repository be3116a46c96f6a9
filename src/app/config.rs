//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file with environment variable
//! overrides for deployment-specific values like the watchlist.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::{FusionMode, LabelingPolicy, Symbol, Timeframe};
use crate::error::{ConfigError, Result};
use crate::fusion::{EngineSettings, ModeWeights, TimeframeFusion};
use crate::learning::{RetrainConfig, TrainerConfig};
use crate::service::{
    AlertSettings, DetectionSettings, ScannerConfig, SentimentSettings,
};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scanner: ScannerSection,
    #[serde(default)]
    pub fusion: FusionSection,
    #[serde(default)]
    pub sentiment: SentimentSection,
    #[serde(default)]
    pub learning: LearningSection,
    #[serde(default)]
    pub alerts: AlertsSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerSection {
    /// Seconds between scan cycles.
    #[serde(default = "default_scan_interval_seconds")]
    pub interval_seconds: u64,
    /// Symbols scanned each cycle.
    #[serde(default = "default_watchlist")]
    pub watchlist: Vec<String>,
    /// Timeframes fetched per symbol, shortest first. The first entry
    /// is the primary detection timeframe.
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<String>,
    /// Bars requested per timeframe.
    #[serde(default = "default_min_bars")]
    pub min_bars: usize,
}

const fn default_scan_interval_seconds() -> u64 {
    120
}

fn default_watchlist() -> Vec<String> {
    vec!["BTC-USD".into(), "ETH-USD".into(), "SOL-USD".into()]
}

fn default_timeframes() -> Vec<String> {
    vec!["1h".into(), "4h".into(), "1d".into()]
}

const fn default_min_bars() -> usize {
    50
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self {
            interval_seconds: default_scan_interval_seconds(),
            watchlist: default_watchlist(),
            timeframes: default_timeframes(),
            min_bars: default_min_bars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FusionSection {
    /// Blend profile: "conservative" or "aggressive".
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Per-layer weights for the conservative profile.
    #[serde(default = "default_conservative_table")]
    pub conservative: WeightTable,
    /// Per-layer weights for the aggressive profile.
    #[serde(default = "default_aggressive_table")]
    pub aggressive: WeightTable,
    /// Per-timeframe weights in trending markets, index-aligned with
    /// `scanner.timeframes`.
    #[serde(default = "default_trending_weights")]
    pub trending_weights: Vec<f64>,
    /// Per-timeframe weights in ranging markets.
    #[serde(default = "default_ranging_weights")]
    pub ranging_weights: Vec<f64>,
    /// Alignment below this marks the timeframes divergent.
    #[serde(default = "default_divergence_threshold")]
    pub divergence_threshold: f64,
    /// Stop distance as a multiple of ATR(14).
    #[serde(default = "default_atr_multiplier")]
    pub atr_multiplier: f64,
    /// Risk/reward the target aims for before structure caps it.
    #[serde(default = "default_min_risk_reward")]
    pub min_risk_reward: f64,
    /// Days of outcome history behind the win-rate layer.
    #[serde(default = "default_history_lookback_days")]
    pub history_lookback_days: i64,
}

/// Per-layer blend weights as they appear in the TOML file.
///
/// Overriding a table overrides it whole; partial tables fail to parse.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WeightTable {
    pub learned: f64,
    pub rule: f64,
    pub sentiment: f64,
    pub context: f64,
    pub history: f64,
}

impl From<WeightTable> for ModeWeights {
    fn from(table: WeightTable) -> Self {
        Self {
            learned: table.learned,
            rule: table.rule,
            sentiment: table.sentiment,
            context: table.context,
            history: table.history,
        }
    }
}

fn default_mode() -> String {
    "conservative".into()
}

fn default_conservative_table() -> WeightTable {
    let w = ModeWeights::conservative();
    WeightTable {
        learned: w.learned,
        rule: w.rule,
        sentiment: w.sentiment,
        context: w.context,
        history: w.history,
    }
}

fn default_aggressive_table() -> WeightTable {
    let w = ModeWeights::aggressive();
    WeightTable {
        learned: w.learned,
        rule: w.rule,
        sentiment: w.sentiment,
        context: w.context,
        history: w.history,
    }
}

fn default_trending_weights() -> Vec<f64> {
    vec![0.25, 0.35, 0.40]
}

fn default_ranging_weights() -> Vec<f64> {
    vec![0.40, 0.35, 0.25]
}

const fn default_divergence_threshold() -> f64 {
    0.5
}

const fn default_atr_multiplier() -> f64 {
    1.5
}

const fn default_min_risk_reward() -> f64 {
    2.0
}

const fn default_history_lookback_days() -> i64 {
    90
}

impl Default for FusionSection {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            conservative: default_conservative_table(),
            aggressive: default_aggressive_table(),
            trending_weights: default_trending_weights(),
            ranging_weights: default_ranging_weights(),
            divergence_threshold: default_divergence_threshold(),
            atr_multiplier: default_atr_multiplier(),
            min_risk_reward: default_min_risk_reward(),
            history_lookback_days: default_history_lookback_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentimentSection {
    /// Seconds a cached snapshot stays fresh.
    #[serde(default = "default_sentiment_ttl_seconds")]
    pub ttl_seconds: i64,
    /// Seconds granted to each source before its weight is dropped.
    #[serde(default = "default_source_timeout_seconds")]
    pub source_timeout_seconds: u64,
    #[serde(default = "default_news_weight")]
    pub news_weight: f64,
    #[serde(default = "default_social_weight")]
    pub social_weight: f64,
    #[serde(default = "default_market_weight")]
    pub market_weight: f64,
}

const fn default_sentiment_ttl_seconds() -> i64 {
    300
}

const fn default_source_timeout_seconds() -> u64 {
    3
}

const fn default_news_weight() -> f64 {
    0.4
}

const fn default_social_weight() -> f64 {
    0.3
}

const fn default_market_weight() -> f64 {
    0.3
}

impl Default for SentimentSection {
    fn default() -> Self {
        Self {
            ttl_seconds: default_sentiment_ttl_seconds(),
            source_timeout_seconds: default_source_timeout_seconds(),
            news_weight: default_news_weight(),
            social_weight: default_social_weight(),
            market_weight: default_market_weight(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LearningSection {
    /// Seconds between retrain ticks.
    #[serde(default = "default_retrain_interval_seconds")]
    pub retrain_interval_seconds: u64,
    /// Labeled samples required before a fit is attempted.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Candidate AUC must exceed this floor to be promoted.
    #[serde(default = "default_metric_floor")]
    pub metric_floor: f64,
    /// How positions are closed: "stop_or_target" or "fixed_horizon".
    #[serde(default = "default_labeling_policy")]
    pub labeling_policy: String,
    /// Bar cutoff for the labeling policy.
    #[serde(default = "default_horizon_bars")]
    pub horizon_bars: usize,
}

const fn default_retrain_interval_seconds() -> u64 {
    180
}

const fn default_min_samples() -> usize {
    50
}

const fn default_metric_floor() -> f64 {
    0.60
}

fn default_labeling_policy() -> String {
    "stop_or_target".into()
}

const fn default_horizon_bars() -> usize {
    20
}

impl Default for LearningSection {
    fn default() -> Self {
        Self {
            retrain_interval_seconds: default_retrain_interval_seconds(),
            min_samples: default_min_samples(),
            metric_floor: default_metric_floor(),
            labeling_policy: default_labeling_policy(),
            horizon_bars: default_horizon_bars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsSection {
    /// Minimum composite confidence for an alert.
    #[serde(default = "default_alert_threshold")]
    pub threshold: f64,
    /// Seconds a raised alert suppresses repeats of the same signal.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,
}

const fn default_alert_threshold() -> f64 {
    0.80
}

const fn default_cooldown_seconds() -> u64 {
    600
}

impl Default for AlertsSection {
    fn default() -> Self {
        Self {
            threshold: default_alert_threshold(),
            cooldown_seconds: default_cooldown_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;

        let mut config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(watchlist) = std::env::var("CHARTIST_WATCHLIST") {
            self.scanner.watchlist = watchlist
                .split(',')
                .map(|symbol| symbol.trim().to_string())
                .filter(|symbol| !symbol.is_empty())
                .collect();
        }
        if let Ok(mode) = std::env::var("CHARTIST_MODE") {
            self.fusion.mode = mode;
        }
        if let Ok(level) = std::env::var("CHARTIST_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.scanner.watchlist.is_empty() {
            return Err(ConfigError::MissingField {
                field: "scanner.watchlist",
            }
            .into());
        }
        if self.scanner.timeframes.is_empty() {
            return Err(ConfigError::MissingField {
                field: "scanner.timeframes",
            }
            .into());
        }
        if self.scanner.interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanner.interval_seconds",
                reason: "must be positive".into(),
            }
            .into());
        }
        if self.scanner.min_bars < crate::detector::MIN_WINDOW {
            return Err(ConfigError::InvalidValue {
                field: "scanner.min_bars",
                reason: format!("must be at least {} bars", crate::detector::MIN_WINDOW),
            }
            .into());
        }

        let timeframes = self.parse_timeframes()?;
        for pair in timeframes.windows(2) {
            if pair[0] >= pair[1] {
                return Err(ConfigError::InvalidValue {
                    field: "scanner.timeframes",
                    reason: "must be strictly ascending, shortest first".into(),
                }
                .into());
            }
        }

        FusionMode::from_str(&self.fusion.mode).map_err(|reason| ConfigError::InvalidValue {
            field: "fusion.mode",
            reason,
        })?;

        Self::check_mode_weights("fusion.conservative", self.fusion.conservative)?;
        Self::check_mode_weights("fusion.aggressive", self.fusion.aggressive)?;
        Self::check_timeframe_weights(
            "fusion.trending_weights",
            &self.fusion.trending_weights,
            timeframes.len(),
        )?;
        Self::check_timeframe_weights(
            "fusion.ranging_weights",
            &self.fusion.ranging_weights,
            timeframes.len(),
        )?;

        if !(0.0..=1.0).contains(&self.fusion.divergence_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "fusion.divergence_threshold",
                reason: "must be within [0, 1]".into(),
            }
            .into());
        }
        if self.fusion.history_lookback_days <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "fusion.history_lookback_days",
                reason: "must be positive".into(),
            }
            .into());
        }
        // Confirms both risk knobs convert to exact decimals.
        self.engine_settings()?;

        if self.sentiment.ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "sentiment.ttl_seconds",
                reason: "must be positive".into(),
            }
            .into());
        }
        if self.sentiment.source_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sentiment.source_timeout_seconds",
                reason: "must be positive".into(),
            }
            .into());
        }
        let source_weights = [
            self.sentiment.news_weight,
            self.sentiment.social_weight,
            self.sentiment.market_weight,
        ];
        let source_sum: f64 = source_weights.iter().sum();
        if source_weights
            .iter()
            .any(|weight| !weight.is_finite() || *weight < 0.0)
            || (source_sum - 1.0).abs() > 1e-6
        {
            return Err(ConfigError::InvalidValue {
                field: "sentiment",
                reason: format!(
                    "source weights must be non-negative and sum to 1, got {source_sum:.6}"
                ),
            }
            .into());
        }

        if self.learning.retrain_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "learning.retrain_interval_seconds",
                reason: "must be positive".into(),
            }
            .into());
        }
        if self.learning.min_samples < 10 {
            return Err(ConfigError::InvalidValue {
                field: "learning.min_samples",
                reason: "must be at least 10 to leave a holdout split".into(),
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.learning.metric_floor) {
            return Err(ConfigError::InvalidValue {
                field: "learning.metric_floor",
                reason: "must be within [0, 1]".into(),
            }
            .into());
        }
        if self.learning.horizon_bars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "learning.horizon_bars",
                reason: "must be positive".into(),
            }
            .into());
        }
        self.labeling_policy()?;

        if !(0.0..=1.0).contains(&self.alerts.threshold) {
            return Err(ConfigError::InvalidValue {
                field: "alerts.threshold",
                reason: "must be within [0, 1]".into(),
            }
            .into());
        }
        if self.alerts.cooldown_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "alerts.cooldown_seconds",
                reason: "must be positive".into(),
            }
            .into());
        }

        Ok(())
    }

    fn check_mode_weights(field: &'static str, table: WeightTable) -> Result<()> {
        let weights = ModeWeights::from(table);
        if weights.as_array().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::InvalidValue {
                field,
                reason: "layer weights must be non-negative".into(),
            }
            .into());
        }
        if !weights.is_normalized() {
            return Err(ConfigError::InvalidValue {
                field,
                reason: format!("layer weights must sum to 1, got {:.6}", weights.sum()),
            }
            .into());
        }
        Ok(())
    }

    fn check_timeframe_weights(
        field: &'static str,
        weights: &[f64],
        timeframe_count: usize,
    ) -> Result<()> {
        if weights.len() != timeframe_count {
            return Err(ConfigError::InvalidValue {
                field,
                reason: format!(
                    "expected one weight per timeframe ({timeframe_count}), got {}",
                    weights.len()
                ),
            }
            .into());
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::InvalidValue {
                field,
                reason: "weights must be non-negative".into(),
            }
            .into());
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::InvalidValue {
                field,
                reason: format!("weights must sum to 1, got {sum:.6}"),
            }
            .into());
        }
        Ok(())
    }

    fn parse_timeframes(&self) -> Result<Vec<Timeframe>> {
        self.scanner
            .timeframes
            .iter()
            .map(|raw| {
                Timeframe::from_str(raw).map_err(|reason| {
                    ConfigError::InvalidValue {
                        field: "scanner.timeframes",
                        reason,
                    }
                    .into()
                })
            })
            .collect()
    }

    /// The configured fusion mode.
    pub fn fusion_mode(&self) -> Result<FusionMode> {
        FusionMode::from_str(&self.fusion.mode).map_err(|reason| {
            ConfigError::InvalidValue {
                field: "fusion.mode",
                reason,
            }
            .into()
        })
    }

    pub fn scanner_config(&self) -> Result<ScannerConfig> {
        Ok(ScannerConfig {
            interval: Duration::from_secs(self.scanner.interval_seconds),
            watchlist: self.scanner.watchlist.iter().map(Symbol::new).collect(),
            mode: self.fusion_mode()?,
        })
    }

    pub fn detection_settings(&self) -> DetectionSettings {
        DetectionSettings {
            min_bars: self.scanner.min_bars,
            history_lookback_days: self.fusion.history_lookback_days,
            ..DetectionSettings::default()
        }
    }

    pub fn timeframe_fusion(&self) -> Result<TimeframeFusion> {
        Ok(TimeframeFusion::new(
            self.parse_timeframes()?,
            self.fusion.trending_weights.clone(),
            self.fusion.ranging_weights.clone(),
            self.fusion.divergence_threshold,
        ))
    }

    pub fn engine_settings(&self) -> Result<EngineSettings> {
        let atr_multiplier = Decimal::try_from(self.fusion.atr_multiplier).map_err(|err| {
            ConfigError::InvalidValue {
                field: "fusion.atr_multiplier",
                reason: err.to_string(),
            }
        })?;
        let min_risk_reward =
            Decimal::try_from(self.fusion.min_risk_reward).map_err(|err| {
                ConfigError::InvalidValue {
                    field: "fusion.min_risk_reward",
                    reason: err.to_string(),
                }
            })?;
        if atr_multiplier <= Decimal::ZERO || min_risk_reward <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "fusion.atr_multiplier",
                reason: "risk knobs must be positive".into(),
            }
            .into());
        }
        Ok(EngineSettings {
            conservative: self.fusion.conservative.into(),
            aggressive: self.fusion.aggressive.into(),
            atr_multiplier,
            min_risk_reward,
        })
    }

    pub fn sentiment_settings(&self) -> SentimentSettings {
        SentimentSettings {
            ttl_seconds: self.sentiment.ttl_seconds,
            source_timeout: Duration::from_secs(self.sentiment.source_timeout_seconds),
            news_weight: self.sentiment.news_weight,
            social_weight: self.sentiment.social_weight,
            market_weight: self.sentiment.market_weight,
        }
    }

    pub fn retrain_config(&self) -> RetrainConfig {
        RetrainConfig {
            interval: Duration::from_secs(self.learning.retrain_interval_seconds),
            trainer: TrainerConfig {
                min_samples: self.learning.min_samples,
                metric_floor: self.learning.metric_floor,
                ..TrainerConfig::default()
            },
        }
    }

    pub fn labeling_policy(&self) -> Result<LabelingPolicy> {
        match self.learning.labeling_policy.as_str() {
            "stop_or_target" => Ok(LabelingPolicy::StopOrTarget {
                max_bars: self.learning.horizon_bars,
            }),
            "fixed_horizon" => Ok(LabelingPolicy::FixedHorizon {
                bars: self.learning.horizon_bars,
            }),
            other => Err(ConfigError::InvalidValue {
                field: "learning.labeling_policy",
                reason: format!("unknown policy: {other}"),
            }
            .into()),
        }
    }

    pub fn alert_settings(&self) -> AlertSettings {
        AlertSettings {
            threshold: self.alerts.threshold,
            cooldown: Duration::from_secs(self.alerts.cooldown_seconds),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scanner: ScannerSection::default(),
            fusion: FusionSection::default(),
            sentiment: SentimentSection::default(),
            learning: LearningSection::default(),
            alerts: AlertsSection::default(),
            logging: LoggingSection::default(),
        }
    }
}

impl Config {
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}
