//! In-process tier: encoded artifacts keyed by [`CacheKey`].
//!
//! Entries never expire. Keys are content-addressed and artifacts immutable,
//! so the only reason to drop an entry is the byte budget, enforced LRU-first.

use std::sync::RwLock;

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tracing::debug;

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::memory";
pub const METRIC_MEMORY_EVICT: &str = "diagram_cache_memory_evict_total";

struct Entries {
    lru: LruCache<CacheKey, Bytes>,
    weight: usize,
}

pub struct MemoryCache {
    entries: RwLock<Entries>,
    budget_bytes: usize,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_budget(config.memory_budget_bytes_non_zero().get())
    }

    pub fn with_budget(budget_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(Entries {
                lru: LruCache::unbounded(),
                weight: 0,
            }),
            budget_bytes,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Bytes> {
        rw_write(&self.entries, SOURCE, "get").lru.get(key).cloned()
    }

    /// Insert an entry, evicting least-recently-used entries until the budget
    /// holds again. Returns the number of entries evicted.
    ///
    /// An entry heavier than the whole budget is not retained.
    pub fn insert(&self, key: CacheKey, value: Bytes) -> usize {
        let weight = value.len();
        if weight > self.budget_bytes {
            debug!(
                target = "diagram_cache::cache::memory",
                op = "memory::insert",
                result = "skipped_oversize",
                cache_key = %key,
                entry_bytes = weight,
                budget_bytes = self.budget_bytes,
                "Entry exceeds memory budget; kept in persistent tier only"
            );
            return 0;
        }

        let mut entries = rw_write(&self.entries, SOURCE, "insert");
        if let Some(previous) = entries.lru.put(key, value) {
            entries.weight -= previous.len();
        }
        entries.weight += weight;

        let mut evicted = 0;
        while entries.weight > self.budget_bytes {
            match entries.lru.pop_lru() {
                Some((_, dropped)) => {
                    entries.weight -= dropped.len();
                    evicted += 1;
                }
                None => break,
            }
        }
        drop(entries);

        if evicted > 0 {
            counter!(METRIC_MEMORY_EVICT).increment(evicted as u64);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes currently held.
    pub fn weight(&self) -> usize {
        rw_read(&self.entries, SOURCE, "weight").weight
    }

    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }

    /// Drop every entry. Used at session teardown; the persistent tier is untouched.
    pub fn clear(&self) {
        let mut entries = rw_write(&self.entries, SOURCE, "clear");
        entries.lru.clear();
        entries.weight = 0;
    }
}
