use cerebro_models::memory_schema::{MemoryRow, MEMORY_TABLE_DDL};
use rusqlite::Connection;

use crate::error::MemoryError;

/// SQLite-backed persistence for memory entries.
pub struct SqliteMemory {
    conn: Connection,
}

impl SqliteMemory {
    /// Open (or create) the memory database at `path` and ensure the schema exists.
    pub fn open(path: &str) -> Result<Self, MemoryError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| MemoryError::Unavailable(format!("{}: {e}", parent.display())))?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(MEMORY_TABLE_DDL)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database with the schema already applied.
    pub fn open_in_memory() -> Result<Self, MemoryError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(MEMORY_TABLE_DDL)?;
        Ok(Self { conn })
    }

    pub fn insert(&self, row: &MemoryRow) -> Result<(), MemoryError> {
        self.conn.execute(
            "INSERT INTO memory_entries (id, kind, content, metadata_json, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                row.id,
                row.kind,
                row.content,
                row.metadata_json,
                row.created_at
            ],
        )?;
        Ok(())
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<MemoryRow>, MemoryError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, kind, content, metadata_json, created_at \
             FROM memory_entries ORDER BY created_at DESC LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(rusqlite::params![limit as i64], |row| {
                Ok(MemoryRow {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    content: row.get(2)?,
                    metadata_json: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn count(&self) -> Result<u64, MemoryError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM memory_entries", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn make_row(id: &str, content: &str, age_seconds: i64) -> MemoryRow {
        MemoryRow {
            id: id.to_string(),
            kind: "execution_result".to_string(),
            content: content.to_string(),
            metadata_json: "{}".to_string(),
            created_at: (Utc::now() - Duration::seconds(age_seconds)).to_rfc3339(),
        }
    }

    #[test]
    fn insert_and_count() {
        let db = SqliteMemory::open_in_memory().unwrap();
        db.insert(&make_row("a", "first", 10)).unwrap();
        db.insert(&make_row("b", "second", 5)).unwrap();
        assert_eq!(db.count().unwrap(), 2);
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let db = SqliteMemory::open_in_memory().unwrap();
        db.insert(&make_row("old", "old", 100)).unwrap();
        db.insert(&make_row("mid", "mid", 50)).unwrap();
        db.insert(&make_row("new", "new", 1)).unwrap();

        let rows = db.recent(2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "new");
        assert_eq!(rows[1].id, "mid");
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let db = SqliteMemory::open_in_memory().unwrap();
        db.insert(&make_row("a", "first", 1)).unwrap();
        assert!(db.insert(&make_row("a", "again", 1)).is_err());
    }

    #[test]
    fn open_file_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.db");
        let path = path.to_str().unwrap();

        {
            let db = SqliteMemory::open(path).unwrap();
            db.insert(&make_row("a", "persisted", 1)).unwrap();
        }

        let reopened = SqliteMemory::open(path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }
}
