use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid memory entry: {0}")]
    Invalid(String),

    #[error("Memory store not available: {0}")]
    Unavailable(String),
}
