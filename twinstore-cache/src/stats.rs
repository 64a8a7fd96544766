use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of cache activity. Purely informational: nothing
/// in the cache's behavior reads these counters back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub poisoned: u64,
}

pub(crate) struct Counters {
    entries: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    poisoned: AtomicU64,
}

impl Default for Counters {
    fn default() -> Self {
        Counters {
            entries: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            poisoned: AtomicU64::new(0),
        }
    }
}

impl Counters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_entry(&self) {
        self.entries.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_eviction(&self) {
        self.entries.fetch_sub(1, Ordering::Relaxed);
    }
    pub fn record_poison(&self) {
        self.poisoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            poisoned: self.poisoned.load(Ordering::Relaxed),
        }
    }
}
