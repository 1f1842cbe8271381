//! Replay guard over settled payment references.
//!
//! Bounded LRU of recently settled references, checked before the ledger
//! write so a replayed proof is rejected without another verifier
//! round-trip. The guard is best-effort; the ledger's unique-reference
//! constraint is the durable check.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default guard capacity.
const DEFAULT_GUARD_CAPACITY: usize = 100_000;

/// LRU set of recently settled payment references.
#[derive(Clone)]
pub struct ReplayGuard {
    inner: Arc<Mutex<LruCache<String, ()>>>,
    stats: Arc<Mutex<GuardStats>>,
}

/// Guard statistics for monitoring.
#[derive(Debug, Default, Clone)]
pub struct GuardStats {
    /// References found in the guard (rejected replays).
    pub hits: u64,
    /// References not found.
    pub misses: u64,
    /// References recorded.
    pub additions: u64,
}

impl ReplayGuard {
    /// Create a guard with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_GUARD_CAPACITY)
    }

    /// Create a guard with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(cap))),
            stats: Arc::new(Mutex::new(GuardStats::default())),
        }
    }

    /// Whether a settlement reference was recently settled.
    pub fn contains(&self, reference: &str) -> bool {
        let mut cache = self.inner.lock();
        let found = cache.get(reference).is_some();

        let mut stats = self.stats.lock();
        if found {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }

        found
    }

    /// Record a settled reference.
    pub fn insert(&self, reference: impl Into<String>) {
        let mut cache = self.inner.lock();
        cache.put(reference.into(), ());

        let mut stats = self.stats.lock();
        stats.additions += 1;
    }

    /// Current guard statistics.
    #[must_use]
    pub fn stats(&self) -> GuardStats {
        self.stats.lock().clone()
    }

    /// Number of tracked references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the guard is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_basic_operations() {
        let guard = ReplayGuard::new();

        assert!(guard.is_empty());
        assert!(!guard.contains("0xaaa"));

        guard.insert("0xaaa");
        assert!(guard.contains("0xaaa"));
        assert!(!guard.contains("0xbbb"));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn test_guard_stats() {
        let guard = ReplayGuard::new();

        assert!(!guard.contains("0xaaa"));
        guard.insert("0xaaa");
        assert!(guard.contains("0xaaa"));

        let stats = guard.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.additions, 1);
    }

    #[test]
    fn test_guard_eviction_is_bounded() {
        let guard = ReplayGuard::with_capacity(2);

        guard.insert("a");
        guard.insert("b");
        guard.insert("c");
        assert_eq!(guard.len(), 2);
        assert!(!guard.contains("a")); // evicted
        assert!(guard.contains("c"));
    }
}
