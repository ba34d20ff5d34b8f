use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cerebro_models::config::MemoryConfig;
use cerebro_models::memory_schema::{MemoryContext, MemoryRow};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::MemoryBackend;
use crate::cache::SearchCache;
use crate::error::MemoryError;
use crate::sqlite::SqliteMemory;

/// Number of recent entries scored per search.
const DEFAULT_SCAN_WINDOW: usize = 500;

/// Keyword-relevance memory: SQLite persistence with a moka cache of recent searches.
///
/// SQLite access is synchronized via `Mutex` since `rusqlite::Connection` is not `Sync`.
pub struct MemoryStore {
    sqlite: Mutex<SqliteMemory>,
    cache: SearchCache,
    scan_window: usize,
}

impl MemoryStore {
    pub fn new(sqlite: SqliteMemory, cache_capacity: u64, cache_ttl: Duration) -> Self {
        Self {
            sqlite: Mutex::new(sqlite),
            cache: SearchCache::new(cache_capacity, cache_ttl),
            scan_window: DEFAULT_SCAN_WINDOW,
        }
    }

    /// Open the store described by `[memory]` in the config file.
    pub fn open(config: &MemoryConfig) -> Result<Self, MemoryError> {
        let sqlite = if config.sqlite_path == ":memory:" {
            SqliteMemory::open_in_memory()?
        } else {
            SqliteMemory::open(&config.sqlite_path)?
        };
        info!(path = %config.sqlite_path, "Opened memory store");
        Ok(Self::new(
            sqlite,
            config.cache_max_capacity,
            Duration::from_secs(config.cache_ttl_seconds),
        ))
    }

    pub fn with_scan_window(mut self, scan_window: usize) -> Self {
        self.scan_window = scan_window;
        self
    }

    pub fn entry_count(&self) -> Result<u64, MemoryError> {
        let sqlite = self
            .sqlite
            .lock()
            .map_err(|e| MemoryError::Unavailable(format!("SQLite mutex poisoned: {e}")))?;
        sqlite.count()
    }

    fn rank(&self, query: &str, limit: usize) -> Result<Vec<MemoryContext>, MemoryError> {
        let rows = {
            let sqlite = self
                .sqlite
                .lock()
                .map_err(|e| MemoryError::Unavailable(format!("SQLite mutex poisoned: {e}")))?;
            sqlite.recent(self.scan_window)?
        };

        let terms = query_terms(query);
        let mut scored: Vec<MemoryContext> = rows
            .into_iter()
            .filter_map(|row| {
                let relevance = relevance(&terms, &row.content);
                if !terms.is_empty() && relevance == 0.0 {
                    return None;
                }
                to_context(row, relevance)
            })
            .collect();

        // Stable sort keeps newest-first order among equally relevant entries.
        scored.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        scored.truncate(limit);
        Ok(scored)
    }
}

#[async_trait]
impl MemoryBackend for MemoryStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MemoryContext>, MemoryError> {
        if let Some(hit) = self.cache.get(query, limit).await {
            return Ok(hit);
        }

        let seen = self.cache.generation();
        let results = self.rank(query, limit)?;
        debug!(query, hits = results.len(), "Memory search");
        self.cache.insert(query, limit, results.clone(), seen).await;
        Ok(results)
    }

    async fn store(
        &self,
        content: &str,
        kind: &str,
        metadata: serde_json::Value,
    ) -> Result<(), MemoryError> {
        if content.trim().is_empty() {
            return Err(MemoryError::Invalid("empty content".to_string()));
        }

        let row = MemoryRow {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            content: content.to_string(),
            metadata_json: serde_json::to_string(&metadata)?,
            // Fixed-width timestamps keep ORDER BY created_at chronological.
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        };

        {
            let sqlite = self
                .sqlite
                .lock()
                .map_err(|e| MemoryError::Unavailable(format!("SQLite mutex poisoned: {e}")))?;
            sqlite.insert(&row)?;
        }

        self.cache.invalidate_all();
        debug!(kind, id = %row.id, "Stored memory entry");
        Ok(())
    }
}

/// Lowercased, deduplicated words of at least three characters.
fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.len() >= 3)
        .map(|t| t.to_lowercase())
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

fn relevance(terms: &[String], content: &str) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let haystack = content.to_lowercase();
    let matched = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
    matched as f64 / terms.len() as f64
}

fn to_context(row: MemoryRow, relevance: f64) -> Option<MemoryContext> {
    let created_at = match DateTime::parse_from_rfc3339(&row.created_at) {
        Ok(ts) => ts.with_timezone(&Utc),
        Err(e) => {
            warn!(id = %row.id, error = %e, "Skipping memory entry with bad timestamp");
            return None;
        }
    };
    let metadata = serde_json::from_str(&row.metadata_json).unwrap_or(serde_json::Value::Null);

    Some(MemoryContext {
        id: row.id,
        kind: row.kind,
        content: row.content,
        metadata,
        relevance,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_store() -> MemoryStore {
        let sqlite = SqliteMemory::open_in_memory().unwrap();
        MemoryStore::new(sqlite, 100, Duration::from_secs(60))
    }

    #[test]
    fn terms_are_normalized() {
        assert_eq!(
            query_terms("SOL stats, sol STATS on it"),
            vec!["sol".to_string(), "stats".to_string()]
        );
    }

    #[test]
    fn relevance_is_fraction_of_terms() {
        let terms = query_terms("profit sandwich strategy");
        assert_eq!(relevance(&terms, "Sandwich profit was flat"), 2.0 / 3.0);
        assert_eq!(relevance(&terms, "nothing here"), 0.0);
    }

    #[tokio::test]
    async fn store_then_search() {
        let store = setup_store();
        store
            .store(
                "Plan: check hft stats. Results: 1 successful",
                "execution_result",
                serde_json::json!({"iteration": 1}),
            )
            .await
            .unwrap();
        store
            .store("Wallet 7xKX bought RAY", "market_signal", serde_json::json!({}))
            .await
            .unwrap();

        let hits = store.search("hft stats", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("hft stats"));
        assert_eq!(hits[0].relevance, 1.0);
        assert_eq!(hits[0].metadata["iteration"], 1);
    }

    #[tokio::test]
    async fn results_ranked_by_relevance() {
        let store = setup_store();
        store
            .store("sandwich profit summary", "execution_result", serde_json::json!({}))
            .await
            .unwrap();
        store
            .store("profit only", "execution_result", serde_json::json!({}))
            .await
            .unwrap();

        let hits = store.search("sandwich profit", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "sandwich profit summary");
    }

    #[tokio::test]
    async fn store_invalidates_cached_search() {
        let store = setup_store();
        assert!(store.search("liquidity", 5).await.unwrap().is_empty());

        store
            .store("liquidity dried up on ORCA", "market_signal", serde_json::json!({}))
            .await
            .unwrap();

        assert_eq!(store.search("liquidity", 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ranking_taken_before_a_store_is_not_cached() {
        let store = setup_store();
        let seen = store.cache.generation();
        let stale = store.rank("liquidity", 5).unwrap();

        store
            .store("liquidity dried up on ORCA", "market_signal", serde_json::json!({}))
            .await
            .unwrap();
        store.cache.insert("liquidity", 5, stale, seen).await;

        assert_eq!(store.search("liquidity", 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let store = setup_store();
        let err = store
            .store("   ", "execution_result", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Invalid(_)));
        assert_eq!(store.entry_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn short_query_returns_recent_entries() {
        let store = setup_store();
        store
            .store("first entry", "execution_result", serde_json::json!({}))
            .await
            .unwrap();

        let hits = store.search("?", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].relevance, 0.0);
    }
}
