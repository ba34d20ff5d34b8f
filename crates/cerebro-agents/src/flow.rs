use std::sync::Arc;
use std::time::Instant;

use cerebro_memory::MemoryBackend;
use cerebro_models::memory_schema::context_kinds;
use cerebro_models::session::{
    ActionBatch, ActionRecord, FlowMetadata, FlowOutcome, Observation, OrchestrationSession,
    ToolCall,
};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::llm::LanguageModel;
use crate::prompts::{final_response_prompt, planning_prompt, system_prompt};
use crate::tools::{ToolExecutor, ToolKind};

/// Characters of plan text used as the fallback memory query.
const FALLBACK_QUERY_CHARS: usize = 100;
/// Characters of plan text kept in a stored insight.
const INSIGHT_PLAN_CHARS: usize = 200;

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Tool calls implied by plan text, matched by keyword.
/// Falls back to a memory search on the plan itself.
pub fn derive_actions(plan: &str) -> Vec<ToolCall> {
    let lower = plan.to_lowercase();
    let mut calls = Vec::new();

    if lower.contains("stats") || lower.contains("statistics") {
        calls.push(ToolCall {
            tool: ToolKind::GetHftStats.as_str().to_string(),
            input: serde_json::json!({}),
        });
    }
    if lower.contains("market") || lower.contains("sentiment") {
        calls.push(ToolCall {
            tool: ToolKind::GetMarketSentiment.as_str().to_string(),
            input: serde_json::json!({}),
        });
    }
    if lower.contains("prometheus") || lower.contains("metrics") {
        calls.push(ToolCall {
            tool: ToolKind::QueryPrometheus.as_str().to_string(),
            input: serde_json::json!({"query": "hft_profit_total"}),
        });
    }

    if calls.is_empty() {
        calls.push(ToolCall {
            tool: ToolKind::SearchMemory.as_str().to_string(),
            input: serde_json::json!({"query": truncate(plan, FALLBACK_QUERY_CHARS)}),
        });
    }
    calls
}

/// Whether another plan/act iteration should run.
///
/// Stops once the iteration budget is spent, when the latest iteration took
/// no actions, or when every action in it succeeded.
pub fn should_continue(session: &OrchestrationSession) -> bool {
    if session.iteration_count >= session.max_iterations {
        return false;
    }
    match session.actions_taken.last() {
        None => false,
        Some(batch) if batch.results.is_empty() => false,
        Some(batch) => !batch.all_succeeded(),
    }
}

pub fn observation_summary(batch: &ActionBatch) -> Observation {
    let failed = batch.failed_count();
    let succeeded = batch.results.len() - failed;
    Observation {
        summary: format!(
            "Executed {} actions: {succeeded} successful, {failed} failed",
            batch.results.len()
        ),
        succeeded,
        failed,
        created_at: Utc::now(),
    }
}

/// Bounded plan → act → observe → remember → decide loop over one query.
pub struct OrchestrationFlow {
    llm: Arc<dyn LanguageModel>,
    tools: Arc<dyn ToolExecutor>,
    memory: Arc<dyn MemoryBackend>,
    max_iterations: u32,
    memory_search_limit: usize,
}

impl OrchestrationFlow {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        tools: Arc<dyn ToolExecutor>,
        memory: Arc<dyn MemoryBackend>,
        max_iterations: u32,
    ) -> Self {
        Self {
            llm,
            tools,
            memory,
            max_iterations,
            memory_search_limit: 5,
        }
    }

    pub fn with_memory_search_limit(mut self, limit: usize) -> Self {
        self.memory_search_limit = limit;
        self
    }

    pub fn llm_name(&self) -> &str {
        self.llm.name()
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.tool_names()
    }

    /// Run one session to completion. Collaborator failures degrade the
    /// result instead of aborting it.
    pub async fn execute(&self, query: &str) -> FlowOutcome {
        let mut session = OrchestrationSession::new(query, self.max_iterations);
        info!(max_iterations = self.max_iterations, "Starting orchestration session");

        loop {
            self.plan(&mut session).await;
            self.act(&mut session).await;
            Self::observe(&mut session);
            self.remember(&session).await;
            Self::decide(&mut session);
            if !session.should_continue {
                break;
            }
        }

        self.finish(session).await
    }

    async fn plan(&self, session: &mut OrchestrationSession) {
        session.memory_context = match self
            .memory
            .search(&session.query, self.memory_search_limit)
            .await
        {
            Ok(context) => context,
            Err(e) => {
                warn!(error = %e, "Memory search failed, planning without context");
                Vec::new()
            }
        };

        let prompt = planning_prompt(
            &session.query,
            &session.memory_context,
            &session.actions_taken,
            &session.observations,
        );
        let system = system_prompt(&self.tools.tool_names());

        let plan = match self.llm.invoke(&system, &prompt).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, iteration = session.iteration_count + 1, "Planning failed, using fallback plan");
                format!("Planning unavailable ({e}). Fall back to recalling: {}", session.query)
            }
        };

        debug!(iteration = session.iteration_count + 1, plan = %truncate(&plan, 100), "Plan ready");
        session.current_plan = Some(plan);
    }

    async fn act(&self, session: &mut OrchestrationSession) {
        let plan = session.current_plan.clone().unwrap_or_default();
        let calls = derive_actions(&plan);
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            let start = Instant::now();
            let outcome = self.tools.invoke(&call.tool, &call.input).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            let record = match outcome {
                Ok(data) => {
                    info!(tool = %call.tool, elapsed_ms, "Action completed");
                    ActionRecord {
                        call,
                        success: true,
                        data: Some(data),
                        error: None,
                        elapsed_ms,
                    }
                }
                Err(e) => {
                    warn!(tool = %call.tool, error = %e, elapsed_ms, "Action failed");
                    ActionRecord {
                        call,
                        success: false,
                        data: None,
                        error: Some(e.to_string()),
                        elapsed_ms,
                    }
                }
            };
            results.push(record);
        }

        session.actions_taken.push(ActionBatch {
            plan,
            results,
            created_at: Utc::now(),
        });
    }

    fn observe(session: &mut OrchestrationSession) {
        if let Some(batch) = session.actions_taken.last() {
            let observation = observation_summary(batch);
            debug!(summary = %observation.summary, "Observed");
            session.observations.push(observation);
        }
    }

    async fn remember(&self, session: &OrchestrationSession) {
        let (Some(plan), Some(observation)) = (&session.current_plan, session.observations.last())
        else {
            return;
        };
        if session.actions_taken.is_empty() {
            return;
        }

        let content = format!(
            "Plan: {}... Results: {}",
            truncate(plan, INSIGHT_PLAN_CHARS),
            observation.summary
        );
        let metadata = serde_json::json!({
            "source": "cerebro_agent",
            "query": session.query,
            "iteration": session.iteration_count,
            "timestamp": Utc::now().to_rfc3339(),
        });

        if let Err(e) = self
            .memory
            .store(&content, context_kinds::EXECUTION_RESULT, metadata)
            .await
        {
            warn!(error = %e, "Failed to store iteration insight");
        }
    }

    fn decide(session: &mut OrchestrationSession) {
        session.iteration_count += 1;
        session.should_continue = should_continue(session);
        info!(
            iteration = session.iteration_count,
            should_continue = session.should_continue,
            "Iteration decided"
        );
    }

    async fn finish(&self, mut session: OrchestrationSession) -> FlowOutcome {
        let prompt = final_response_prompt(&session);
        let system = system_prompt(&self.tools.tool_names());

        let response = match self.llm.invoke(&system, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Final response generation failed");
                let last = session
                    .observations
                    .last()
                    .map(|o| o.summary.clone())
                    .unwrap_or_else(|| "no actions were observed".to_string());
                format!(
                    "I could not generate a full answer ({e}). After {} iteration(s): {last}.",
                    session.iteration_count
                )
            }
        };
        session.final_response = Some(response.clone());

        let metadata = FlowMetadata {
            query: session.query.clone(),
            started_at: session.started_at,
            completed_at: Utc::now(),
            total_iterations: session.iteration_count,
            total_actions: session.total_actions(),
            total_observations: session.observations.len(),
        };

        info!(
            iterations = metadata.total_iterations,
            actions = metadata.total_actions,
            "Orchestration session finished"
        );

        FlowOutcome {
            response,
            iterations: session.iteration_count,
            actions_count: metadata.total_actions,
            observations_count: metadata.total_observations,
            metadata,
        }
    }
}
