use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Counters for one analyst instance. Owned by the analyst and updated under its lock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalystMetrics {
    pub total_queries: u64,
    pub successful_responses: u64,
    /// Mean wall-clock seconds over successful responses.
    pub average_response_time: f64,
    pub total_actions_executed: u64,
    pub human_approvals_requested: u64,
    pub auto_approvals: u64,
    pub multi_agent_analyses: u64,
    pub memory_entries_created: u64,
}

impl AnalystMetrics {
    pub fn record_success(&mut self, elapsed: Duration) {
        self.successful_responses += 1;
        let n = self.successful_responses as f64;
        self.average_response_time += (elapsed.as_secs_f64() - self.average_response_time) / n;
    }

    /// Fraction of queries that produced a response, 0.0 before the first query.
    pub fn success_rate(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            self.successful_responses as f64 / self.total_queries as f64
        }
    }
}
