//! Bounded, time-boxed cache of preview results keyed by request URL

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lru::LruCache;

use super::PreviewResult;

/// Source of "now" for expiry checks
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: PreviewResult,
    stored_at: Instant,
}

/// Preview cache with a TTL and an LRU capacity bound
///
/// Keys are the exact request URL, with no normalization. Stale entries are
/// dropped when they are next looked up; the capacity bound evicts the least
/// recently used entry on insert.
pub struct PreviewCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl PreviewCache {
    /// Create a cache using the system clock
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self::with_clock(ttl, max_entries, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit clock
    #[must_use]
    pub fn with_clock(ttl: Duration, max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            clock,
        }
    }

    /// Return the cached result if it is younger than the TTL
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<PreviewResult> {
        let now = self.clock.now();
        let mut entries = self.lock();

        let fresh = entries
            .get(key)
            .map(|entry| now.saturating_duration_since(entry.stored_at) < self.ttl)?;

        if fresh {
            entries.get(key).map(|entry| entry.result.clone())
        } else {
            entries.pop(key);
            None
        }
    }

    /// Store a result, replacing any existing entry for `key`
    pub fn store(&self, key: &str, result: PreviewResult) {
        let entry = CacheEntry {
            result,
            stored_at: self.clock.now(),
        };
        if let Some((evicted, _)) = self.lock().push(key.to_string(), entry) {
            if evicted != key {
                tracing::debug!(url = %evicted, "evicted preview from full cache");
            }
        }
    }

    /// Number of entries currently held (including not-yet-collected stale ones)
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured time-to-live
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, CacheEntry>> {
        // Poisoning leaves the map usable
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for PreviewCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewCache")
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
