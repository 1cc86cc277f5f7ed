use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Crypto quotes go stale quickly
pub const CRYPTO_TTL: Duration = Duration::from_secs(5 * 60);
/// Fiat rates drift slowly enough to hold for an hour
pub const FIAT_TTL: Duration = Duration::from_secs(60 * 60);

/// One observed USD rate for a symbol
#[derive(Debug, Clone, Copy)]
pub struct CachedRate {
    pub price: f64,
    pub observed_at: Instant,
}

/// In-process rate cache keyed by uppercase symbol.
///
/// Entries are only ever overwritten, never removed. The cache is shared by
/// both rate sources, so callers wrap it in a lock; the sources themselves
/// never hold one across a network call.
#[derive(Debug, Default)]
pub struct RateCache {
    entries: HashMap<String, CachedRate>,
}

impl RateCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the cached price if the entry is younger than `ttl`
    pub fn fresh(&self, symbol: &str, ttl: Duration) -> Option<f64> {
        let entry = self.entries.get(&symbol.to_uppercase())?;
        if entry.observed_at.elapsed() < ttl {
            Some(entry.price)
        } else {
            None
        }
    }

    /// Store an observation for a symbol, stamped with the current time
    pub fn store(&mut self, symbol: &str, price: f64) {
        self.entries.insert(
            symbol.to_uppercase(),
            CachedRate {
                price,
                observed_at: Instant::now(),
            },
        );
    }

    /// Raw entry lookup, ignoring freshness
    pub fn get(&self, symbol: &str) -> Option<CachedRate> {
        self.entries.get(&symbol.to_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
impl RateCache {
    /// Age an entry artificially so TTL paths can be exercised in tests
    pub fn backdate(&mut self, symbol: &str, age: Duration) {
        if let Some(entry) = self.entries.get_mut(&symbol.to_uppercase()) {
            if let Some(observed_at) = entry.observed_at.checked_sub(age) {
                entry.observed_at = observed_at;
            }
        }
    }
}
