use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalystError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Market data unavailable: {0}")]
    Market(String),

    #[error("Analysis task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Memory(#[from] cerebro_memory::MemoryError),

    #[error(transparent)]
    Approval(#[from] cerebro_approval::ApprovalError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
