// =============================================================================
// Duplicate-signal defense — in-process LRU of processed (symbol, timestamp)
// pairs, held for >= 10 minutes (spec §4.3 "Duplicate-signal defense")
// =============================================================================

use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::Instant;

const HOLD: std::time::Duration = std::time::Duration::from_secs(10 * 60);

pub struct SignalDedupe {
    seen: LruCache<(String, i64), Instant>,
}

impl SignalDedupe {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap())),
        }
    }

    /// Returns `true` if `(symbol, timestamp)` was already processed within
    /// the hold window; otherwise records it and returns `false`.
    pub fn already_processed(&mut self, symbol: &str, timestamp: i64) -> bool {
        let key = (symbol.to_string(), timestamp);
        if let Some(seen_at) = self.seen.get(&key) {
            if seen_at.elapsed() < HOLD {
                return true;
            }
        }
        self.seen.put(key, Instant::now());
        false
    }
}
