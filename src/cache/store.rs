//! Storage for cached index responses.

use std::sync::RwLock;
use std::time::Duration;

use bytes::Bytes;
use lru::LruCache;
use tokio::time::Instant;

use super::config::CacheConfig;
use super::keys::IndexKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Cached HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// Store consulted by the index cache middleware.
///
/// Entries are never refreshed by data changes; they leave the store only by
/// expiring, by LRU eviction or through [`PageCache::clear`].
pub trait PageCache: Send + Sync {
    fn get(&self, key: &IndexKey) -> Option<CachedResponse>;

    fn set(&self, key: IndexKey, response: CachedResponse, ttl: Duration);

    /// Evict every entry, returning how many were dropped.
    fn clear(&self) -> usize;
}

struct Entry {
    response: CachedResponse,
    expires_at: Instant,
}

/// In-process LRU store whose entries carry an expiry instant.
pub struct MemoryPageCache {
    entries: RwLock<LruCache<IndexKey, Entry>>,
}

impl MemoryPageCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.max_entries_non_zero())),
        }
    }

    /// Number of stored entries, expired ones included until they are touched.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PageCache for MemoryPageCache {
    fn get(&self, key: &IndexKey) -> Option<CachedResponse> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.response.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    fn set(&self, key: IndexKey, response: CachedResponse, ttl: Duration) {
        let entry = Entry {
            response,
            expires_at: Instant::now() + ttl,
        };
        rw_write(&self.entries, SOURCE, "set").put(key, entry);
    }

    fn clear(&self) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "clear");
        let dropped = entries.len();
        entries.clear();
        dropped
    }
}
