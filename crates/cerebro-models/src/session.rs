use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory_schema::MemoryContext;

/// A tool invocation derived from plan text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    pub input: serde_json::Value,
}

/// Outcome of executing one tool call. Failures are recorded, never raised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRecord {
    pub call: ToolCall,
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// All actions executed during one iteration, with the plan that produced them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionBatch {
    pub plan: String,
    pub results: Vec<ActionRecord>,
    pub created_at: DateTime<Utc>,
}

impl ActionBatch {
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub summary: String,
    pub succeeded: usize,
    pub failed: usize,
    pub created_at: DateTime<Utc>,
}

/// State of one plan/act/observe/decide run. Owned by a single `execute` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestrationSession {
    pub query: String,
    pub current_plan: Option<String>,
    pub actions_taken: Vec<ActionBatch>,
    pub observations: Vec<Observation>,
    pub memory_context: Vec<MemoryContext>,
    pub iteration_count: u32,
    pub max_iterations: u32,
    pub should_continue: bool,
    pub final_response: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl OrchestrationSession {
    pub fn new(query: &str, max_iterations: u32) -> Self {
        Self {
            query: query.to_string(),
            current_plan: None,
            actions_taken: Vec::new(),
            observations: Vec::new(),
            memory_context: Vec::new(),
            iteration_count: 0,
            max_iterations,
            should_continue: true,
            final_response: None,
            started_at: Utc::now(),
        }
    }

    /// Number of individual tool calls across all iterations.
    pub fn total_actions(&self) -> usize {
        self.actions_taken.iter().map(|b| b.results.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowMetadata {
    pub query: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total_iterations: u32,
    pub total_actions: usize,
    pub total_observations: usize,
}

/// What `execute(query)` hands back to its caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowOutcome {
    pub response: String,
    pub metadata: FlowMetadata,
    pub iterations: u32,
    pub actions_count: usize,
    pub observations_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tool: &str, success: bool) -> ActionRecord {
        ActionRecord {
            call: ToolCall {
                tool: tool.to_string(),
                input: serde_json::json!({}),
            },
            success,
            data: None,
            error: (!success).then(|| "boom".to_string()),
            elapsed_ms: 3,
        }
    }

    #[test]
    fn batch_success_accounting() {
        let batch = ActionBatch {
            plan: "check stats".to_string(),
            results: vec![record("get_hft_stats", true), record("search_memory", false)],
            created_at: Utc::now(),
        };
        assert!(!batch.all_succeeded());
        assert_eq!(batch.failed_count(), 1);
    }

    #[test]
    fn new_session_defaults() {
        let session = OrchestrationSession::new("how are we doing?", 5);
        assert!(session.should_continue);
        assert_eq!(session.iteration_count, 0);
        assert_eq!(session.max_iterations, 5);
        assert_eq!(session.total_actions(), 0);
        assert!(session.final_response.is_none());
    }
}
