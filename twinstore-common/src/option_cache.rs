//! Session-option cache shared by every store-specific session layer: the
//! RDB side keys on its `SessionOptions`, the document side keys on its own
//! option struct, and both want the same freshness-window/eager-sweep
//! behavior rather than two copies of it.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

const FRESHNESS_WINDOW: Duration = Duration::from_secs(300);
const EAGER_SWEEP_SIZE: usize = 512;

/// Implemented by an option struct that can be reduced to a single cache
/// key. Fields that fork a dedicated resource per call (e.g. an explicit
/// transaction request) are expected to be excluded from the hash, or
/// better, checked with a `debug_assert!` at the call site the way
/// `SessionOptions::open_tx` is.
pub trait CacheKeyed {
    fn cache_key(&self) -> u64;
}

struct CacheEntry<S> {
    session: S,
    expires_at: Instant,
}

/// Caches non-transactional sessions keyed by their option tuple. Entries
/// carry their own freshness window and are swept lazily on access, plus
/// eagerly once the table grows past a bound.
pub struct OptionCache<S: Clone> {
    entries: DashMap<u64, CacheEntry<S>>,
}

impl<S: Clone> Default for OptionCache<S> {
    fn default() -> Self {
        OptionCache { entries: DashMap::new() }
    }
}

impl<S: Clone> OptionCache<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with<K: CacheKeyed>(&self, options: &K, make: impl FnOnce() -> S) -> S {
        let key = options.cache_key();

        if let Some(entry) = self.entries.get(&key) {
            if entry.expires_at > Instant::now() {
                return entry.session.clone();
            }
        }

        self.sweep_if_large();

        let session = make();
        self.entries.insert(
            key,
            CacheEntry {
                session: session.clone(),
                expires_at: Instant::now() + FRESHNESS_WINDOW,
            },
        );
        session
    }

    fn sweep_if_large(&self) {
        if self.entries.len() < EAGER_SWEEP_SIZE {
            return;
        }
        let now = Instant::now();
        self.entries.retain(|_, v| v.expires_at > now);
    }

    pub fn sweep_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, v| v.expires_at > now);
    }
}
