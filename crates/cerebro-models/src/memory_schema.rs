use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The SQLite table the memory store persists context entries into.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS memory_entries (
///     id            TEXT PRIMARY KEY,
///     kind          TEXT NOT NULL,
///     content       TEXT NOT NULL,
///     metadata_json TEXT NOT NULL,
///     created_at    TEXT NOT NULL
/// );
/// ```
pub const MEMORY_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS memory_entries (
    id            TEXT PRIMARY KEY,
    kind          TEXT NOT NULL,
    content       TEXT NOT NULL,
    metadata_json TEXT NOT NULL,
    created_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_memory_kind ON memory_entries(kind);
CREATE INDEX IF NOT EXISTS idx_memory_created ON memory_entries(created_at);
";

/// Context-kind labels written by the orchestration layer.
pub mod context_kinds {
    pub const EXECUTION_RESULT: &str = "execution_result";
    pub const SUCCESSFUL_INTERACTION: &str = "successful_interaction";
    pub const ENHANCED_ANALYSIS: &str = "enhanced_analysis";
    pub const MARKET_SIGNAL: &str = "market_signal";
}

/// A raw memory row as read from SQLite.
#[derive(Debug, Clone)]
pub struct MemoryRow {
    pub id: String,
    pub kind: String,
    pub content: String,
    pub metadata_json: String,
    pub created_at: String,
}

/// A retrieved memory entry with its relevance to the search query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryContext {
    pub id: String,
    pub kind: String,
    pub content: String,
    pub metadata: serde_json::Value,
    /// Fraction of query terms found in the content, 0.0 to 1.0.
    pub relevance: f64,
    pub created_at: DateTime<Utc>,
}
