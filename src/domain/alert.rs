//! Alerts and the dedup keys that suppress repeats.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AlertId, Symbol};

/// Stable 64-bit identity for a symbol + pattern pair.
///
/// FNV-1a over `symbol|pattern_name`, so the key survives process
/// restarts (a randomly seeded hasher would not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey(u64);

impl DedupKey {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    /// Derive the key for a symbol/pattern pair.
    #[must_use]
    pub fn new(symbol: &Symbol, pattern_name: &str) -> Self {
        let mut hash = Self::FNV_OFFSET;
        for byte in symbol
            .as_str()
            .bytes()
            .chain(std::iter::once(b'|'))
            .chain(pattern_name.bytes())
        {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(Self::FNV_PRIME);
        }
        Self(hash)
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// An emitted alert for a qualifying detection.
///
/// Invariant: no two alerts with the same `dedup_key` are emitted
/// inside one cool-down window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub symbol: Symbol,
    pub pattern_name: String,
    pub composite_confidence: f64,
    pub created_at: DateTime<Utc>,
    pub dedup_key: DedupKey,
    /// Repeats for the same key are suppressed until this instant.
    pub suppressed_until: DateTime<Utc>,
}
