//! Dual-bounded LRU cache for expensive graph queries.
//!
//! Entries are bounded both by count and by an estimated memory footprint.
//! The estimate is a shape heuristic, not an exact measurement: it only has
//! to give bigger values a bigger charge so eviction pressure is ordered
//! sensibly. Recency is a total order maintained by the backing
//! [`lru::LruCache`] list, so eviction ties cannot occur.

use crate::schema::DependencyGraph;
use atlas_core::CacheConfig;
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Flat charge for values without a more specific estimate.
pub const DEFAULT_ENTRY_COST: usize = 256;

const GRAPH_BASE_COST: usize = 512;
const NODE_COST: usize = 256;
const EDGE_COST: usize = 128;
const ELEMENT_COST: usize = 64;

/// Estimated in-memory footprint of a cached value.
pub trait EstimateSize {
    fn estimated_size(&self) -> usize {
        DEFAULT_ENTRY_COST
    }
}

impl EstimateSize for DependencyGraph {
    fn estimated_size(&self) -> usize {
        GRAPH_BASE_COST + self.node_count() * NODE_COST + self.edge_count() * EDGE_COST
    }
}

impl<T> EstimateSize for Vec<T> {
    fn estimated_size(&self) -> usize {
        DEFAULT_ENTRY_COST + self.len() * ELEMENT_COST
    }
}

impl EstimateSize for String {}
impl EstimateSize for usize {}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub current_size_bytes: usize,
    pub max_entries: usize,
    pub max_memory_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    /// hits / (hits + misses), 0.0 before any lookup
    pub hit_rate: f64,
}

struct Entry<V> {
    value: V,
    size: usize,
}

struct CacheInner<V> {
    entries: LruCache<String, Entry<V>>,
    current_size: usize,
    hits: u64,
    misses: u64,
}

/// Memoization layer in front of expensive graph queries.
///
/// The cache carries its own lock, decoupled from the registry's schema
/// lock, because population happens on the read path.
pub struct QueryCache<V> {
    inner: Mutex<CacheInner<V>>,
    max_entries: usize,
    max_memory: usize,
}

impl<V: Clone + EstimateSize> QueryCache<V> {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::unbounded(),
                current_size: 0,
                hits: 0,
                misses: 0,
            }),
            max_entries: config.max_entries,
            max_memory: config.max_memory_bytes,
        }
    }

    /// Look up a key. A hit promotes the entry to most-recently-used.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        let value = inner.entries.get(key).map(|entry| entry.value.clone());
        match value {
            Some(value) => {
                inner.hits += 1;
                trace!(key, "query cache hit");
                Some(value)
            }
            None => {
                inner.misses += 1;
                trace!(key, "query cache miss");
                None
            }
        }
    }

    /// Insert or update a key, then evict least-recently-used entries until
    /// both the entry bound and the memory bound hold.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let size = value.estimated_size();
        let mut inner = self.inner.lock();

        if let Some(previous) = inner.entries.put(key, Entry { value, size }) {
            // updating an existing key adjusts accounting by the delta
            inner.current_size = inner.current_size.saturating_sub(previous.size);
        }
        inner.current_size += size;

        while inner.entries.len() > self.max_entries || inner.current_size > self.max_memory {
            match inner.entries.pop_lru() {
                Some((evicted, entry)) => {
                    inner.current_size = inner.current_size.saturating_sub(entry.size);
                    trace!(key = %evicted, size = entry.size, "evicted cache entry");
                }
                None => break,
            }
        }
    }

    /// Drop every entry and reset size accounting and hit/miss counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.current_size = 0;
        inner.hits = 0;
        inner.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let lookups = inner.hits + inner.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            inner.hits as f64 / lookups as f64
        };
        CacheStats {
            entries: inner.entries.len(),
            current_size_bytes: inner.current_size,
            max_entries: self.max_entries,
            max_memory_bytes: self.max_memory,
            hits: inner.hits,
            misses: inner.misses,
            hit_rate,
        }
    }
}
