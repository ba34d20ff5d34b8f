use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use cerebro_memory::MemoryBackend;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AgentError;

/// Identifiers of the tools the orchestration loop knows how to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    GetHftStats,
    GetMarketSentiment,
    QueryPrometheus,
    SearchMemory,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::GetHftStats,
        ToolKind::GetMarketSentiment,
        ToolKind::QueryPrometheus,
        ToolKind::SearchMemory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::GetHftStats => "get_hft_stats",
            ToolKind::GetMarketSentiment => "get_market_sentiment",
            ToolKind::QueryPrometheus => "query_prometheus",
            ToolKind::SearchMemory => "search_memory",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete tool implementation.
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    async fn call(&self, input: &serde_json::Value) -> Result<serde_json::Value, AgentError>;
}

/// Tool-execution collaborator. Unknown tool names are a failed call, never a panic.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn invoke(
        &self,
        tool: &str,
        input: &serde_json::Value,
    ) -> Result<serde_json::Value, AgentError>;

    fn tool_names(&self) -> Vec<&'static str>;
}

/// Maps tool identifiers to implementations; resolved once when built.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `tool`, replacing any previous implementation of the same kind.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.kind(), tool);
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn invoke(
        &self,
        tool: &str,
        input: &serde_json::Value,
    ) -> Result<serde_json::Value, AgentError> {
        let kind =
            ToolKind::parse(tool).ok_or_else(|| AgentError::Tool(format!("unknown tool: {tool}")))?;
        let implementation = self
            .tools
            .get(&kind)
            .ok_or_else(|| AgentError::Tool(format!("tool not registered: {kind}")))?;
        debug!(tool = %kind, "Invoking tool");
        implementation.call(input).await
    }

    fn tool_names(&self) -> Vec<&'static str> {
        let mut kinds: Vec<ToolKind> = self.tools.keys().copied().collect();
        kinds.sort();
        kinds.into_iter().map(|k| k.as_str()).collect()
    }
}

/// `search_memory`: keyword search over the memory collaborator.
pub struct MemorySearchTool {
    memory: Arc<dyn MemoryBackend>,
    default_limit: usize,
}

impl MemorySearchTool {
    pub fn new(memory: Arc<dyn MemoryBackend>, default_limit: usize) -> Self {
        Self {
            memory,
            default_limit,
        }
    }
}

#[async_trait]
impl Tool for MemorySearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SearchMemory
    }

    async fn call(&self, input: &serde_json::Value) -> Result<serde_json::Value, AgentError> {
        let query = input
            .get("query")
            .and_then(|q| q.as_str())
            .ok_or_else(|| AgentError::Tool("search_memory requires a string `query`".to_string()))?;
        let limit = input
            .get("limit")
            .and_then(|l| l.as_u64())
            .map(|l| l as usize)
            .unwrap_or(self.default_limit);

        let results = self.memory.search(query, limit).await?;
        Ok(serde_json::json!({
            "query": query,
            "count": results.len(),
            "results": results,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{InMemoryMemory, StaticTool};

    #[test]
    fn kinds_round_trip_through_names() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ToolKind::parse("web_search"), None);
    }

    #[tokio::test]
    async fn unknown_tool_is_a_failure() {
        let registry = ToolRegistry::new();
        let err = registry
            .invoke("launch_rockets", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown tool"));
    }

    #[tokio::test]
    async fn known_but_unregistered_tool_is_a_failure() {
        let registry = ToolRegistry::new();
        let err = registry
            .invoke("get_hft_stats", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not registered"));
    }

    #[tokio::test]
    async fn registered_tool_is_dispatched() {
        let registry = ToolRegistry::new().with(Arc::new(StaticTool::new(
            ToolKind::GetHftStats,
            serde_json::json!({"profit": 1.5}),
        )));

        let data = registry
            .invoke("get_hft_stats", &serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(data["profit"], 1.5);
        assert_eq!(registry.tool_names(), vec!["get_hft_stats"]);
    }

    #[tokio::test]
    async fn memory_search_tool_queries_backend() {
        let memory = Arc::new(InMemoryMemory::new());
        memory
            .store("sandwich profit report", "execution_result", serde_json::json!({}))
            .await
            .unwrap();
        let tool = MemorySearchTool::new(memory, 5);

        let data = tool
            .call(&serde_json::json!({"query": "sandwich"}))
            .await
            .unwrap();
        assert_eq!(data["count"], 1);

        assert!(tool.call(&serde_json::json!({})).await.is_err());
    }
}
