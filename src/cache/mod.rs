//! Diagram Cache
//!
//! Two tiers sit behind [`DiagramCache::get_or_create`]:
//!
//! - **Memory**: per-session LRU of encoded artifacts, bounded by a byte budget
//! - **Persistent**: content-addressed files shared across runs and processes
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! directory = "/tmp/diagram-cache"
//! memory_budget_bytes = 67108864
//! ```

pub mod codec;
mod config;
mod keys;
mod lock;
mod memory;
mod orchestrator;
mod persistent;

pub use codec::CodecError;
pub use config::CacheConfig;
pub(crate) use config::{DEFAULT_CACHE_DIRECTORY, DEFAULT_MEMORY_BUDGET_BYTES};
pub use keys::{CacheKey, D2_NAMESPACE, GOAT_NAMESPACE, build_goat_key, build_key};
pub use memory::MemoryCache;
pub use orchestrator::DiagramCache;
pub use persistent::{FileStore, PersistentStore, StoreError};

/// Names of every metric the cache emits.
pub mod metric_names {
    pub use super::memory::METRIC_MEMORY_EVICT as MEMORY_EVICT;
    pub use super::orchestrator::{
        METRIC_INFLIGHT_WAIT as INFLIGHT_WAIT, METRIC_MEMORY_HIT as MEMORY_HIT,
        METRIC_RENDER as RENDER, METRIC_RENDER_ERROR as RENDER_ERROR,
        METRIC_RENDER_MS as RENDER_MS, METRIC_STORE_HIT as STORE_HIT,
    };
}
