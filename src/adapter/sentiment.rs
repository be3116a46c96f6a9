//! Sentiment source adapters used by tests and replay runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{SourceKind, SourceReading, Symbol};
use crate::error::Result;
use crate::port::SentimentSource;

/// A source that always returns the same reading.
///
/// The call counter makes coalescing observable: concurrent readers of
/// a cold cache must produce exactly one fetch.
pub struct StaticSource {
    kind: SourceKind,
    reading: SourceReading,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticSource {
    #[must_use]
    pub fn new(kind: SourceKind, score: f64) -> Self {
        Self {
            kind,
            reading: SourceReading {
                score,
                sample_count: 10,
                keywords: vec![],
            },
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.reading.keywords = keywords;
        self
    }

    #[must_use]
    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.reading.sample_count = sample_count;
        self
    }

    /// Sleep this long inside every fetch, to force overlap in tests.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SentimentSource for StaticSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn source_name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self, _symbol: &Symbol) -> Result<SourceReading> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.reading.clone())
    }
}

/// A source that fails a fixed number of fetches before recovering.
pub struct FlakySource {
    kind: SourceKind,
    failures: AtomicUsize,
    recovered: SourceReading,
    calls: AtomicUsize,
}

impl FlakySource {
    /// A source that never succeeds.
    #[must_use]
    pub fn failing(kind: SourceKind) -> Self {
        Self::recovering_after(kind, usize::MAX, 0.0)
    }

    /// Fail the first `failures` fetches, then serve `score`.
    #[must_use]
    pub fn recovering_after(kind: SourceKind, failures: usize, score: f64) -> Self {
        Self {
            kind,
            failures: AtomicUsize::new(failures),
            recovered: SourceReading {
                score,
                sample_count: 5,
                keywords: vec![],
            },
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of fetches attempted so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SentimentSource for FlakySource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn source_name(&self) -> &'static str {
        "flaky"
    }

    async fn fetch(&self, _symbol: &Symbol) -> Result<SourceReading> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.failures.fetch_sub(1, Ordering::SeqCst);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "simulated source outage",
            )
            .into());
        }
        Ok(self.recovered.clone())
    }
}
