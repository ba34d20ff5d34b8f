use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use cerebro_models::memory_schema::MemoryContext;
use moka::future::Cache;

/// Hot cache of recent search results, backed by moka.
///
/// Entries are evicted after TTL and dropped wholesale whenever a new
/// memory entry is stored, since any write can change a ranking. The
/// generation counter lets a search that ranked before a write skip caching
/// its now-stale result.
pub struct SearchCache {
    inner: Cache<String, Vec<MemoryContext>>,
    generation: AtomicU64,
}

impl SearchCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            generation: AtomicU64::new(0),
        }
    }

    /// Read before ranking; pass the value back to `insert`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn key(query: &str, limit: usize) -> String {
        format!("{limit}:{}", query.trim().to_lowercase())
    }

    pub async fn get(&self, query: &str, limit: usize) -> Option<Vec<MemoryContext>> {
        self.inner.get(&Self::key(query, limit)).await
    }

    /// Cache `results` unless a write has happened since `seen` was read.
    pub async fn insert(&self, query: &str, limit: usize, results: Vec<MemoryContext>, seen: u64) {
        if self.generation() != seen {
            return;
        }
        let key = Self::key(query, limit);
        self.inner.insert(key.clone(), results).await;
        // A write that landed between the check and the insert may have
        // cleared the cache before this entry existed.
        if self.generation() != seen {
            self.inner.invalidate(&key).await;
        }
    }

    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
