//! Page-level cache for the global index.
//!
//! The rendered `/` response is stored per `page` query value for a fixed
//! time-to-live. Configuration lives under `[cache]`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! index_ttl_seconds = 20
//! max_entries = 256
//! ```

mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use config::CacheConfig;
pub use keys::IndexKey;
pub use middleware::{CacheState, index_cache_layer};
pub use store::{CachedResponse, MemoryPageCache, PageCache};

pub const METRIC_INDEX_HIT: &str = "blogvoyage_index_cache_hit_total";
pub const METRIC_INDEX_MISS: &str = "blogvoyage_index_cache_miss_total";
pub const METRIC_INDEX_FLUSH: &str = "blogvoyage_index_cache_flush_total";
