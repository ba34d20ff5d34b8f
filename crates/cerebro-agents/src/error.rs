use cerebro_models::AgentRole;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid analysis input: {0}")]
    InvalidInput(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Memory error: {0}")]
    Memory(#[from] cerebro_memory::MemoryError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BusError {
    #[error("Role already registered: {0}")]
    AlreadyRegistered(AgentRole),
}
