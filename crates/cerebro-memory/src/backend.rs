use async_trait::async_trait;
use cerebro_models::memory_schema::MemoryContext;

use crate::error::MemoryError;

/// Long-term context store consulted while planning and written after each iteration.
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// Return up to `limit` entries relevant to `query`, most relevant first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MemoryContext>, MemoryError>;

    async fn store(
        &self,
        content: &str,
        kind: &str,
        metadata: serde_json::Value,
    ) -> Result<(), MemoryError>;
}
