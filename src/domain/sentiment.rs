//! Sentiment snapshots and source readings.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::id::Symbol;

/// Category of a sentiment source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    News,
    Social,
    Market,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::News => "news",
            SourceKind::Social => "social",
            SourceKind::Market => "market",
        };
        write!(f, "{s}")
    }
}

/// One source's raw contribution for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReading {
    /// Normalized sentiment in [-1, 1].
    pub score: f64,
    /// Number of underlying samples (articles, posts, tickers).
    pub sample_count: usize,
    pub keywords: Vec<String>,
}

/// Aggregated sentiment for a symbol at a point in time.
///
/// Snapshots are replaced wholesale when stale, never mutated in place.
/// Sub-scores are `None` when that source was unavailable; its weight
/// was redistributed across the sources that did report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSnapshot {
    pub symbol: Symbol,
    pub news_score: Option<f64>,
    pub social_score: Option<f64>,
    pub market_score: Option<f64>,
    /// Weighted blend of the available sub-scores, in [-1, 1].
    pub overall_score: f64,
    pub source_counts: BTreeMap<SourceKind, usize>,
    pub trending_keywords: Vec<String>,
    pub computed_at: DateTime<Utc>,
    pub ttl_seconds: i64,
}

impl SentimentSnapshot {
    /// Whether the snapshot is still inside its TTL at `now`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.computed_at + Duration::seconds(self.ttl_seconds) > now
    }

    /// Number of sources that reported.
    #[must_use]
    pub fn available_sources(&self) -> usize {
        [self.news_score, self.social_score, self.market_score]
            .iter()
            .filter(|s| s.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ttl_seconds: i64) -> SentimentSnapshot {
        SentimentSnapshot {
            symbol: Symbol::new("BTC-USD"),
            news_score: Some(0.4),
            social_score: None,
            market_score: Some(-0.2),
            overall_score: 0.1,
            source_counts: BTreeMap::new(),
            trending_keywords: vec![],
            computed_at: Utc::now(),
            ttl_seconds,
        }
    }

    #[test]
    fn fresh_within_ttl() {
        let snap = snapshot(300);
        assert!(snap.is_fresh(Utc::now()));
    }

    #[test]
    fn stale_after_ttl() {
        let snap = snapshot(300);
        assert!(!snap.is_fresh(Utc::now() + Duration::seconds(301)));
    }

    #[test]
    fn negative_ttl_is_immediately_stale() {
        let snap = snapshot(-1);
        assert!(!snap.is_fresh(Utc::now()));
    }

    #[test]
    fn counts_available_sources() {
        let snap = snapshot(300);
        assert_eq!(snap.available_sources(), 2);
    }
}
