use std::sync::Arc;
use std::time::{Duration, Instant};

use cerebro_agents::{MultiAgentCoordinator, OrchestrationFlow};
use cerebro_approval::ApprovalManager;
use cerebro_memory::MemoryBackend;
use cerebro_models::agent_message::{AgentRole, CollaborativeResult};
use cerebro_models::approval::ApprovalStatus;
use cerebro_models::config::TradingConfig;
use cerebro_models::memory_schema::context_kinds;
use cerebro_models::session::{FlowMetadata, FlowOutcome};
use cerebro_models::signal::MarketSignal;
use cerebro_models::trade_decision::TradingDecision;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::decision::{build_decision, render_enhanced_response, ApprovalOutcome};
use crate::error::AnalystError;
use crate::intent::Intent;
use crate::market::MarketDataSource;
use crate::metrics::AnalystMetrics;

const SOURCE: &str = "trading_analyst";
const SUMMARY_CHARS: usize = 200;
const RECOMMENDATION_QUERY: &str = "performance analysis trading";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub content: String,
    /// Caller context for user turns, response metadata for assistant turns.
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Result of a plain orchestration-loop analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub response: String,
    pub intent: Intent,
    pub llm_used: String,
    /// Seconds.
    pub execution_time: f64,
    pub iterations: u32,
    pub actions_executed: usize,
    pub observations_made: usize,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<FlowMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementsUsed {
    pub multi_agent: bool,
    pub human_loop: bool,
    pub advanced_confidence: bool,
}

/// Result of the collaborative path: role opinions, an optional gated decision and a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedResponse {
    pub response: String,
    pub intent: Intent,
    pub multi_agent_result: Option<CollaborativeResult>,
    pub trading_decision: Option<TradingDecision>,
    pub approval: Option<ApprovalOutcome>,
    pub enhancements_used: EnhancementsUsed,
    pub execution_time: f64,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub memory: bool,
    pub llm: String,
    pub tools: Vec<String>,
    pub agent_roles: Vec<AgentRole>,
    pub workers_running: bool,
    pub pending_approvals: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystStatus {
    pub status: String,
    pub session_id: String,
    pub metrics: AnalystMetrics,
    /// Share of queries answered without error.
    pub success_rate: f64,
    pub components: ComponentStatus,
    pub conversation_length: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A proactive hint about what to ask next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub action: String,
}

struct Session {
    id: String,
    history: Vec<ConversationTurn>,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            history: Vec::new(),
        }
    }
}

struct Sweeper {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Per-query driver that wires the orchestration loop, the role coordinator
/// and the approval gate together and keeps session metrics.
pub struct TradingAnalyst {
    flow: Arc<OrchestrationFlow>,
    coordinator: Arc<MultiAgentCoordinator>,
    approvals: Arc<ApprovalManager>,
    memory: Arc<dyn MemoryBackend>,
    market: Arc<dyn MarketDataSource>,
    trading: TradingConfig,
    session: Mutex<Session>,
    metrics: Mutex<AnalystMetrics>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl TradingAnalyst {
    pub fn new(
        flow: OrchestrationFlow,
        coordinator: MultiAgentCoordinator,
        approvals: Arc<ApprovalManager>,
        memory: Arc<dyn MemoryBackend>,
        market: Arc<dyn MarketDataSource>,
        trading: TradingConfig,
    ) -> Self {
        let session = Session::new();
        info!(session_id = %session.id, "Trading analyst initialized");
        Self {
            flow: Arc::new(flow),
            coordinator: Arc::new(coordinator),
            approvals,
            memory,
            market,
            trading,
            session: Mutex::new(session),
            metrics: Mutex::new(AnalystMetrics::default()),
            sweeper: Mutex::new(None),
        }
    }

    pub fn approvals(&self) -> &Arc<ApprovalManager> {
        &self.approvals
    }

    pub fn coordinator(&self) -> &Arc<MultiAgentCoordinator> {
        &self.coordinator
    }

    /// Periodically time out expired approval requests until `shutdown`.
    pub async fn start_expiry_sweeper(&self, interval: Duration) {
        let mut sweeper = self.sweeper.lock().await;
        if sweeper.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let handle = self.approvals.spawn_expiry_sweeper(interval, cancel.clone());
        *sweeper = Some(Sweeper { cancel, handle });
    }

    pub async fn session_id(&self) -> String {
        self.session.lock().await.id.clone()
    }

    pub async fn metrics(&self) -> AnalystMetrics {
        self.metrics.lock().await.clone()
    }

    /// Answer `query` through the orchestration loop.
    ///
    /// Never fails: an unexpected error becomes an apology response and the
    /// counters updated before it are kept.
    pub async fn analyze(&self, query: &str, context: serde_json::Value) -> AnalysisResponse {
        let start = Instant::now();
        self.metrics.lock().await.total_queries += 1;
        self.push_turn(Speaker::User, query, context).await;

        let intent = Intent::classify(query);
        info!(intent = %intent, "Analyzing query");

        match self.run_flow(query).await {
            Ok(outcome) => {
                let elapsed = start.elapsed();
                {
                    let mut metrics = self.metrics.lock().await;
                    metrics.record_success(elapsed);
                    metrics.total_actions_executed += outcome.actions_count as u64;
                }

                let session_id = self.session_id().await;
                self.remember_interaction(query, &outcome, intent, elapsed, &session_id)
                    .await;

                let response = AnalysisResponse {
                    response: outcome.response,
                    intent,
                    llm_used: self.flow.llm_name().to_string(),
                    execution_time: elapsed.as_secs_f64(),
                    iterations: outcome.iterations,
                    actions_executed: outcome.actions_count,
                    observations_made: outcome.observations_count,
                    session_id,
                    timestamp: Utc::now(),
                    metadata: Some(outcome.metadata),
                    error: None,
                };
                self.push_turn(
                    Speaker::Assistant,
                    &response.response,
                    serde_json::json!({
                        "intent": intent,
                        "iterations": response.iterations,
                        "actions_executed": response.actions_executed,
                        "execution_time": response.execution_time,
                    }),
                )
                .await;
                response
            }
            Err(e) => {
                error!(error = %e, "Analysis failed");
                AnalysisResponse {
                    response: format!(
                        "I apologize, but I encountered an error while analyzing your request: {e}"
                    ),
                    intent,
                    llm_used: self.flow.llm_name().to_string(),
                    execution_time: start.elapsed().as_secs_f64(),
                    iterations: 0,
                    actions_executed: 0,
                    observations_made: 0,
                    session_id: self.session_id().await,
                    timestamp: Utc::now(),
                    metadata: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn run_flow(&self, query: &str) -> Result<FlowOutcome, AnalystError> {
        let flow = Arc::clone(&self.flow);
        let query = query.to_string();
        tokio::spawn(async move { flow.execute(&query).await })
            .await
            .map_err(|e| AnalystError::Task(e.to_string()))
    }

    /// Collect role opinions, derive a trading decision when the query asks
    /// for one and gate it through the approval manager.
    pub async fn enhanced_analysis(&self, query: &str, context: serde_json::Value) -> EnhancedResponse {
        let start = Instant::now();
        self.metrics.lock().await.total_queries += 1;
        self.push_turn(Speaker::User, query, context.clone()).await;

        let intent = Intent::classify(query);
        match self.run_enhanced(query, context, intent).await {
            Ok(mut response) => {
                let elapsed = start.elapsed();
                self.metrics.lock().await.record_success(elapsed);
                response.execution_time = elapsed.as_secs_f64();

                self.remember_enhanced(query, &response).await;
                self.push_turn(
                    Speaker::Assistant,
                    &response.response,
                    serde_json::json!({
                        "intent": intent,
                        "enhancements_used": response.enhancements_used,
                        "approval": response.approval,
                    }),
                )
                .await;
                response
            }
            Err(e) => {
                error!(error = %e, "Enhanced analysis failed");
                EnhancedResponse {
                    response: format!("Analysis failed: {e}"),
                    intent,
                    multi_agent_result: None,
                    trading_decision: None,
                    approval: None,
                    enhancements_used: EnhancementsUsed::default(),
                    execution_time: start.elapsed().as_secs_f64(),
                    session_id: self.session_id().await,
                    timestamp: Utc::now(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn run_enhanced(
        &self,
        query: &str,
        context: serde_json::Value,
        intent: Intent,
    ) -> Result<EnhancedResponse, AnalystError> {
        let market_data = self.market.market_conditions().await?;
        let portfolio_data = self.market.portfolio().await?;
        let historical = self.market.historical_performance().await?;

        let mut data = serde_json::json!({
            "query": query,
            "market_data": market_data,
            "portfolio_data": portfolio_data,
            "historical_data": historical,
            "position_data": {
                "amount": self.trading.default_amount.to_f64().unwrap_or_default(),
                "token_symbol": self.trading.default_token,
            },
        });
        if let (Some(fields), Some(extra)) = (data.as_object_mut(), context.as_object()) {
            for (key, value) in extra {
                if key != "query" {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }
        data["context"] = context;

        let collaboration = if self.coordinator.roles().is_empty() {
            None
        } else {
            let result = self.coordinator.collaborative_analysis(&data).await;
            self.metrics.lock().await.multi_agent_analyses += 1;
            Some(result)
        };

        let decision = build_decision(
            query,
            collaboration.as_ref().map(|c| &c.synthesis),
            &data["market_data"],
            &historical,
            &self.trading,
        );

        let approval = match &decision {
            Some(decision) => Some(self.gate(decision.clone()).await?),
            None => None,
        };

        let response = render_enhanced_response(
            query,
            collaboration.as_ref(),
            decision.as_ref(),
            approval.as_ref(),
        );

        Ok(EnhancedResponse {
            response,
            intent,
            enhancements_used: EnhancementsUsed {
                multi_agent: collaboration.is_some(),
                human_loop: approval.is_some(),
                advanced_confidence: decision.is_some(),
            },
            multi_agent_result: collaboration,
            trading_decision: decision,
            approval,
            execution_time: 0.0,
            session_id: self.session_id().await,
            timestamp: Utc::now(),
            error: None,
        })
    }

    async fn gate(&self, decision: TradingDecision) -> Result<ApprovalOutcome, AnalystError> {
        let request = self.approvals.request_approval(decision).await?;
        let mut metrics = self.metrics.lock().await;
        let outcome = if request.status == ApprovalStatus::AutoApproved {
            metrics.auto_approvals += 1;
            ApprovalOutcome::AutoApproved {
                request_id: request.id,
                confidence: request.decision.confidence_score,
            }
        } else {
            metrics.human_approvals_requested += 1;
            ApprovalOutcome::Pending {
                request_id: request.id,
                expires_at: request.expires_at,
            }
        };
        Ok(outcome)
    }

    /// Record an external market event and analyze it on the collaborative path.
    /// Critical risk events are also pushed to every notification channel.
    pub async fn handle_signal(&self, signal: &MarketSignal) -> EnhancedResponse {
        let session_id = self.session_id().await;
        info!(event_type = signal.event_type(), "Handling market signal");

        match serde_json::to_string(signal) {
            Ok(content) => {
                let metadata = serde_json::json!({
                    "source": SOURCE,
                    "event_type": signal.event_type(),
                    "critical": signal.is_critical(),
                    "session_id": session_id,
                    "timestamp": Utc::now(),
                });
                self.store_memory(&content, context_kinds::MARKET_SIGNAL, metadata)
                    .await;
            }
            Err(e) => warn!(error = %e, "Could not serialize market signal"),
        }

        if signal.is_critical() {
            let alert = serde_json::json!({
                "type": signal.event_type(),
                "critical": true,
                "message": signal.to_query(),
                "signal": signal,
            });
            self.approvals
                .notifications()
                .await
                .send_trading_alert(&alert)
                .await;
        }

        let context = serde_json::json!({
            "event_type": signal.event_type(),
            "signal": signal,
        });
        self.enhanced_analysis(&signal.to_query(), context).await
    }

    /// The last `limit` turns, oldest first.
    pub async fn conversation_history(&self, limit: usize) -> Vec<ConversationTurn> {
        let session = self.session.lock().await;
        let start = session.history.len().saturating_sub(limit);
        session.history[start..].to_vec()
    }

    pub async fn status(&self) -> AnalystStatus {
        let (session_id, conversation_length) = {
            let session = self.session.lock().await;
            (session.id.clone(), session.history.len())
        };
        let metrics = self.metrics().await;
        AnalystStatus {
            status: "active".to_string(),
            session_id,
            success_rate: metrics.success_rate(),
            metrics,
            components: ComponentStatus {
                memory: true,
                llm: self.flow.llm_name().to_string(),
                tools: self.flow.tool_names().into_iter().map(String::from).collect(),
                agent_roles: self.coordinator.roles(),
                workers_running: self.coordinator.is_running().await,
                pending_approvals: self.approvals.get_pending_requests().await.len(),
            },
            conversation_length,
            timestamp: Utc::now(),
        }
    }

    /// Start a fresh session id with an empty conversation. Metrics are kept.
    pub async fn reset_session(&self) -> String {
        let mut session = self.session.lock().await;
        let previous = std::mem::replace(&mut *session, Session::new());
        info!(old = %previous.id, new = %session.id, "Session reset");
        session.id.clone()
    }

    pub async fn recommendations(&self) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();

        match self.memory.search(RECOMMENDATION_QUERY, 5).await {
            Ok(found) if !found.is_empty() => suggestions.push(Suggestion {
                kind: "performance_review".to_string(),
                title: "Recent Performance Analysis Available".to_string(),
                description: "I found recent trading data that might need your attention.".to_string(),
                priority: Priority::Medium,
                action: "Ask me about your recent trading performance".to_string(),
            }),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Memory search for recommendations failed"),
        }

        suggestions.push(Suggestion {
            kind: "system_health".to_string(),
            title: "System Health Check".to_string(),
            description: "Regular system monitoring is recommended.".to_string(),
            priority: Priority::Low,
            action: "Ask me to check system health".to_string(),
        });
        suggestions
    }

    /// Stop background work and announce the shutdown on every channel.
    pub async fn shutdown(&self) {
        if let Some(sweeper) = self.sweeper.lock().await.take() {
            sweeper.cancel.cancel();
            if let Err(e) = sweeper.handle.await {
                error!(error = %e, "Expiry sweeper panicked");
            }
        }
        self.coordinator.stop().await;

        let status = serde_json::json!({
            "status": "shutdown",
            "session_id": self.session_id().await,
            "metrics": self.metrics().await,
        });
        self.approvals
            .notifications()
            .await
            .send_system_status(&status)
            .await;
        info!("Trading analyst shut down");
    }

    async fn push_turn(&self, speaker: Speaker, content: &str, details: serde_json::Value) {
        self.session.lock().await.history.push(ConversationTurn {
            speaker,
            content: content.to_string(),
            details,
            timestamp: Utc::now(),
        });
    }

    async fn remember_interaction(
        &self,
        query: &str,
        outcome: &FlowOutcome,
        intent: Intent,
        elapsed: Duration,
        session_id: &str,
    ) {
        let content = serde_json::json!({
            "query": query,
            "response_summary": summarize(&outcome.response),
            "intent": intent,
            "execution_time": elapsed.as_secs_f64(),
            "actions_count": outcome.actions_count,
            "success": true,
        });
        let metadata = serde_json::json!({
            "source": SOURCE,
            "session_id": session_id,
            "intent": intent,
            "timestamp": Utc::now(),
        });
        self.store_memory(&content.to_string(), context_kinds::SUCCESSFUL_INTERACTION, metadata)
            .await;
    }

    async fn remember_enhanced(&self, query: &str, response: &EnhancedResponse) {
        let content = serde_json::json!({
            "query": query,
            "response_summary": summarize(&response.response),
            "recommendation": response
                .multi_agent_result
                .as_ref()
                .map(|r| r.synthesis.recommendation),
            "decision": response.trading_decision.as_ref().map(|d| serde_json::json!({
                "action": d.action,
                "token_symbol": d.token_symbol,
                "confidence_score": d.confidence_score,
                "risk_level": d.risk_level,
            })),
            "approval": response.approval,
        });
        let metadata = serde_json::json!({
            "source": SOURCE,
            "session_id": response.session_id,
            "intent": response.intent,
            "timestamp": response.timestamp,
        });
        self.store_memory(&content.to_string(), context_kinds::ENHANCED_ANALYSIS, metadata)
            .await;
    }

    async fn store_memory(&self, content: &str, kind: &str, metadata: serde_json::Value) {
        match self.memory.store(content, kind, metadata).await {
            Ok(()) => self.metrics.lock().await.memory_entries_created += 1,
            Err(e) => warn!(kind, error = %e, "Failed to store memory entry"),
        }
    }
}

fn summarize(text: &str) -> String {
    if text.chars().count() > SUMMARY_CHARS {
        let head: String = text.chars().take(SUMMARY_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
