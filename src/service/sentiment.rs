//! Sentiment aggregation across news, social, and market sources.
//!
//! Sources are polled concurrently with a per-source timeout, blended
//! under fixed kind weights, and cached per symbol with a TTL. A dead
//! source only loses its own weight; the whole layer goes unavailable
//! only when every source is out.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{Layer, SentimentSnapshot, SourceKind, Symbol};
use crate::error::{Error, Result};
use crate::fusion::redistribute;
use crate::port::SentimentSource;

const MAX_TRENDING_KEYWORDS: usize = 8;

/// Knobs for the aggregator.
#[derive(Debug, Clone)]
pub struct SentimentSettings {
    /// Snapshot freshness window.
    pub ttl_seconds: i64,
    /// Budget for each individual source fetch.
    pub source_timeout: std::time::Duration,
    pub news_weight: f64,
    pub social_weight: f64,
    pub market_weight: f64,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            source_timeout: std::time::Duration::from_secs(3),
            news_weight: 0.4,
            social_weight: 0.3,
            market_weight: 0.3,
        }
    }
}

/// Caching fan-out over the configured sentiment sources.
///
/// Snapshots are replaced wholesale on refresh, never mutated in
/// place. Concurrent misses for one symbol coalesce through a
/// per-symbol mutex so only one fetch hits the sources.
pub struct SentimentAggregator {
    sources: Vec<Arc<dyn SentimentSource>>,
    cache: DashMap<Symbol, SentimentSnapshot>,
    fetch_locks: DashMap<Symbol, Arc<Mutex<()>>>,
    settings: SentimentSettings,
}

impl SentimentAggregator {
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn SentimentSource>>, settings: SentimentSettings) -> Self {
        Self {
            sources,
            cache: DashMap::new(),
            fetch_locks: DashMap::new(),
            settings,
        }
    }

    /// Current sentiment for the symbol, from cache when fresh.
    ///
    /// `Error::LayerUnavailable` when no source responds; partial
    /// outages degrade into a snapshot built from whatever responded.
    pub async fn snapshot(&self, symbol: &Symbol) -> Result<SentimentSnapshot> {
        let now = Utc::now();
        if let Some(hit) = self.cache.get(symbol) {
            if hit.is_fresh(now) {
                return Ok(hit.clone());
            }
        }

        let lock = self
            .fetch_locks
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another caller may have refreshed while we waited.
        let now = Utc::now();
        if let Some(hit) = self.cache.get(symbol) {
            if hit.is_fresh(now) {
                return Ok(hit.clone());
            }
        }

        let snapshot = self.refresh(symbol).await?;
        self.cache.insert(symbol.clone(), snapshot.clone());
        Ok(snapshot)
    }

    /// Number of snapshots currently cached.
    #[must_use]
    pub fn cached_symbols(&self) -> usize {
        self.cache.len()
    }

    async fn refresh(&self, symbol: &Symbol) -> Result<SentimentSnapshot> {
        let fetches = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            let symbol = symbol.clone();
            let timeout = self.settings.source_timeout;
            async move {
                let outcome = tokio::time::timeout(timeout, source.fetch(&symbol)).await;
                (source.kind(), source.source_name(), outcome)
            }
        });

        let mut per_kind: BTreeMap<SourceKind, Vec<f64>> = BTreeMap::new();
        let mut source_counts: BTreeMap<SourceKind, usize> = BTreeMap::new();
        let mut trending_keywords: Vec<String> = Vec::new();
        for (kind, name, outcome) in join_all(fetches).await {
            let reading = match outcome {
                Ok(Ok(reading)) => reading,
                Ok(Err(error)) => {
                    warn!(source = name, kind = %kind, %error, "sentiment source failed");
                    continue;
                }
                Err(_) => {
                    warn!(source = name, kind = %kind, "sentiment source timed out");
                    continue;
                }
            };
            per_kind
                .entry(kind)
                .or_default()
                .push(reading.score.clamp(-1.0, 1.0));
            *source_counts.entry(kind).or_default() += reading.sample_count;
            for keyword in reading.keywords {
                if !trending_keywords.contains(&keyword) {
                    trending_keywords.push(keyword);
                }
            }
        }
        trending_keywords.truncate(MAX_TRENDING_KEYWORDS);

        let news_score = mean(per_kind.get(&SourceKind::News));
        let social_score = mean(per_kind.get(&SourceKind::Social));
        let market_score = mean(per_kind.get(&SourceKind::Market));

        let weights = [
            self.settings.news_weight,
            self.settings.social_weight,
            self.settings.market_weight,
        ];
        let scores = [news_score, social_score, market_score];
        let available: Vec<bool> = scores.iter().map(Option::is_some).collect();
        let Some(weights) = redistribute(&weights, &available) else {
            return Err(Error::LayerUnavailable {
                layer: Layer::Sentiment,
                reason: format!("no sentiment source responded for {symbol}"),
            });
        };
        let overall_score = weights
            .iter()
            .zip(scores)
            .filter_map(|(w, s)| s.map(|s| w * s))
            .sum::<f64>()
            .clamp(-1.0, 1.0);

        debug!(
            %symbol,
            overall = overall_score,
            sources = per_kind.len(),
            "sentiment snapshot refreshed"
        );
        Ok(SentimentSnapshot {
            symbol: symbol.clone(),
            news_score,
            social_score,
            market_score,
            overall_score,
            source_counts,
            trending_keywords,
            computed_at: Utc::now(),
            ttl_seconds: self.settings.ttl_seconds,
        })
    }
}

fn mean(scores: Option<&Vec<f64>>) -> Option<f64> {
    let scores = scores?;
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}
