//! Two-tier get-or-create with per-key single flight.
//!
//! Lookup order is memory, then the persistent store, then the caller's
//! compute function. A successful computation is written to the persistent
//! store first and to memory second. A failed one is written nowhere, so the
//! next call for that key computes again.
//!
//! Concurrent callers for the same key share one computation: the first
//! caller leads, later callers block on the flight until the leader finishes
//! and receive its outcome. Unrelated keys never wait on each other.

use std::{
    fmt,
    sync::{Arc, Condvar, Mutex},
    time::Instant,
};

use bytes::Bytes;
use dashmap::{DashMap, mapref::entry::Entry};
use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use crate::application::error::DiagramError;

use super::codec;
use super::config::CacheConfig;
use super::keys::CacheKey;
use super::lock::{condvar_wait, mutex_lock};
use super::memory::MemoryCache;
use super::persistent::{FileStore, PersistentStore, StoreError};

const SOURCE: &str = "cache::orchestrator";
pub const METRIC_MEMORY_HIT: &str = "diagram_cache_memory_hit_total";
pub const METRIC_STORE_HIT: &str = "diagram_cache_store_hit_total";
pub const METRIC_RENDER: &str = "diagram_cache_render_total";
pub const METRIC_RENDER_ERROR: &str = "diagram_cache_render_error_total";
pub const METRIC_INFLIGHT_WAIT: &str = "diagram_cache_inflight_wait_total";
pub const METRIC_RENDER_MS: &str = "diagram_cache_render_ms";

type Outcome = Result<Bytes, DiagramError>;

/// Session-scoped cache shared by every caller of a build or run.
pub struct DiagramCache {
    memory: MemoryCache,
    store: Arc<dyn PersistentStore>,
    flights: DashMap<CacheKey, Arc<Flight>>,
}

impl DiagramCache {
    pub fn new(config: &CacheConfig, store: Arc<dyn PersistentStore>) -> Self {
        Self {
            memory: MemoryCache::new(config),
            store,
            flights: DashMap::new(),
        }
    }

    /// Open a cache persisted under `config.directory`.
    pub fn open(config: &CacheConfig) -> Result<Self, StoreError> {
        let store = FileStore::new(&config.directory)?;
        Ok(Self::new(config, Arc::new(store)))
    }

    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    /// Return the encoded artifact for `key`, computing it at most once per
    /// key at a time.
    pub fn get_or_create<F>(&self, key: &CacheKey, compute: F) -> Outcome
    where
        F: FnOnce() -> Outcome,
    {
        if let Some(bytes) = self.memory.get(key) {
            counter!(METRIC_MEMORY_HIT).increment(1);
            debug!(
                target = "diagram_cache::cache::orchestrator",
                op = "cache::get_or_create",
                result = "memory_hit",
                cache_key = %key,
                "Diagram served from memory"
            );
            return Ok(bytes);
        }

        match self.join_flight(key) {
            Role::Follower(flight) => {
                counter!(METRIC_INFLIGHT_WAIT).increment(1);
                debug!(
                    target = "diagram_cache::cache::orchestrator",
                    op = "cache::get_or_create",
                    result = "inflight_wait",
                    cache_key = %key,
                    "Waiting for in-flight computation"
                );
                flight.wait()
            }
            Role::Leader(guard) => {
                let outcome = self.lead(key, compute);
                guard.finish(outcome)
            }
        }
    }

    fn join_flight(&self, key: &CacheKey) -> Role<'_> {
        match self.flights.entry(key.clone()) {
            Entry::Occupied(occupied) => Role::Follower(Arc::clone(occupied.get())),
            Entry::Vacant(vacant) => {
                let flight = Arc::new(Flight::new());
                vacant.insert(Arc::clone(&flight));
                Role::Leader(FlightGuard {
                    flights: &self.flights,
                    key: key.clone(),
                    flight,
                    finished: false,
                })
            }
        }
    }

    fn lead<F>(&self, key: &CacheKey, compute: F) -> Outcome
    where
        F: FnOnce() -> Outcome,
    {
        // A previous leader may have filled memory between our miss and joining the flight.
        if let Some(bytes) = self.memory.get(key) {
            counter!(METRIC_MEMORY_HIT).increment(1);
            return Ok(bytes);
        }

        let started_at = Instant::now();
        if let Some(bytes) = self.store.get(key)? {
            codec::decode(&bytes).map_err(|source| {
                warn!(
                    target = "diagram_cache::cache::orchestrator",
                    op = "cache::get_or_create",
                    result = "corrupt_entry",
                    cache_key = %key,
                    error = %source,
                    "Persistent cache entry failed to decode"
                );
                DiagramError::Corrupt {
                    key: key.to_string(),
                    source,
                }
            })?;
            self.memory.insert(key.clone(), bytes.clone());
            counter!(METRIC_STORE_HIT).increment(1);
            info!(
                target = "diagram_cache::cache::orchestrator",
                op = "cache::get_or_create",
                result = "store_hit",
                cache_key = %key,
                entry_bytes = bytes.len(),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "Diagram served from persistent store"
            );
            return Ok(bytes);
        }

        counter!(METRIC_RENDER).increment(1);
        let compute_started_at = Instant::now();
        let computed = compute();
        histogram!(METRIC_RENDER_MS).record(compute_started_at.elapsed().as_secs_f64() * 1000.0);
        let bytes = computed.inspect_err(|err| {
            counter!(METRIC_RENDER_ERROR).increment(1);
            warn!(
                target = "diagram_cache::cache::orchestrator",
                op = "cache::get_or_create",
                result = "error",
                cache_key = %key,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error = %err,
                "Diagram computation failed; nothing cached"
            );
        })?;

        let stored = self.store.put_if_absent(key, bytes)?;
        self.memory.insert(key.clone(), stored.clone());
        info!(
            target = "diagram_cache::cache::orchestrator",
            op = "cache::get_or_create",
            result = "computed",
            cache_key = %key,
            entry_bytes = stored.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Diagram computed and cached"
        );
        Ok(stored)
    }
}

impl fmt::Debug for DiagramCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagramCache")
            .field("memory_entries", &self.memory.len())
            .field("memory_weight", &self.memory.weight())
            .field("in_flight", &self.flights.len())
            .finish_non_exhaustive()
    }
}

enum Role<'a> {
    Leader(FlightGuard<'a>),
    Follower(Arc<Flight>),
}

struct Flight {
    outcome: Mutex<Option<Outcome>>,
    done: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn complete(&self, outcome: Outcome) {
        *mutex_lock(&self.outcome, SOURCE, "flight.complete") = Some(outcome);
        self.done.notify_all();
    }

    fn wait(&self) -> Outcome {
        let mut slot = mutex_lock(&self.outcome, SOURCE, "flight.wait");
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = condvar_wait(&self.done, slot, SOURCE, "flight.wait");
        }
    }
}

/// Held by the leader. Dropping it without `finish` (the compute function
/// panicked) still releases followers, with [`DiagramError::Interrupted`].
struct FlightGuard<'a> {
    flights: &'a DashMap<CacheKey, Arc<Flight>>,
    key: CacheKey,
    flight: Arc<Flight>,
    finished: bool,
}

impl FlightGuard<'_> {
    fn finish(mut self, outcome: Outcome) -> Outcome {
        self.release(outcome.clone());
        self.finished = true;
        outcome
    }

    fn release(&self, outcome: Outcome) {
        // Unregister before waking followers: later callers then either hit
        // memory or start a fresh flight instead of reading a stale failure.
        self.flights.remove(&self.key);
        self.flight.complete(outcome);
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.release(Err(DiagramError::Interrupted {
                key: self.key.to_string(),
            }));
        }
    }
}
