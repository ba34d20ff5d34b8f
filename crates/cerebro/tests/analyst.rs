//! End-to-end tests for the trading analyst.
//!
//! The language model, analysis roles, memory and notification channel are
//! test doubles. Market data is the default static snapshot (volatility 0.3,
//! liquidity 0.7, success rate 0.75), so decision confidence is
//! `(synthesis confidence + 0.75) / 2`.

use std::sync::Arc;
use std::time::Duration;

use cerebro::agents::test_support::{FixedAgent, InMemoryMemory, ScriptedLlm};
use cerebro::agents::{
    AnalysisAgent, MemorySearchTool, MessageBus, MultiAgentCoordinator, OrchestrationFlow,
    ToolRegistry,
};
use cerebro::approval::test_support::RecordingChannel;
use cerebro::approval::ApprovalManager;
use cerebro::models::agent_message::AgentRole;
use cerebro::models::approval::ApprovalStatus;
use cerebro::models::config::{MarketConfig, TradingConfig};
use cerebro::models::memory_schema::context_kinds;
use cerebro::models::signal::MarketSignal;
use cerebro::models::trade_decision::{RiskLevel, TradeAction};
use cerebro::tools::{MarketConditionsTool, TradingStatsTool};
use cerebro::{ApprovalOutcome, Intent, MarketDataSource, StaticMarketData, TradingAnalyst};
use rust_decimal_macros::dec;

struct Harness {
    analyst: TradingAnalyst,
    llm: Arc<ScriptedLlm>,
    memory: Arc<InMemoryMemory>,
    channel: Arc<RecordingChannel>,
}

async fn harness_with_market(
    llm: ScriptedLlm,
    agents: Vec<Arc<dyn AnalysisAgent>>,
    market: StaticMarketData,
) -> Harness {
    let llm = Arc::new(llm);
    let memory = Arc::new(InMemoryMemory::new());
    let market: Arc<dyn MarketDataSource> = Arc::new(market);

    let tools = ToolRegistry::new()
        .with(Arc::new(MemorySearchTool::new(memory.clone(), 5)))
        .with(Arc::new(MarketConditionsTool::new(market.clone())))
        .with(Arc::new(TradingStatsTool::new(market.clone())));
    let flow = OrchestrationFlow::new(llm.clone(), Arc::new(tools), memory.clone(), 5);

    let coordinator =
        MultiAgentCoordinator::new(Arc::new(MessageBus::new()), agents, Duration::from_secs(2));

    let channel = Arc::new(RecordingChannel::new("recording"));
    let approvals = Arc::new(ApprovalManager::default());
    approvals.add_notification_channel(channel.clone()).await;

    let analyst = TradingAnalyst::new(
        flow,
        coordinator,
        approvals,
        memory.clone(),
        market,
        TradingConfig::default(),
    );
    Harness {
        analyst,
        llm,
        memory,
        channel,
    }
}

async fn harness(llm: ScriptedLlm, agents: Vec<Arc<dyn AnalysisAgent>>) -> Harness {
    harness_with_market(llm, agents, StaticMarketData::default()).await
}

fn fixed(role: AgentRole, label: &str, confidence: f64) -> Arc<dyn AnalysisAgent> {
    Arc::new(FixedAgent::new(role, label, confidence))
}

#[tokio::test]
async fn analyze_runs_the_loop_and_records_the_interaction() {
    let h = harness(ScriptedLlm::repeating("Check the stats"), Vec::new()).await;

    let response = h
        .analyst
        .analyze("How is my performance this week?", serde_json::json!({"user": "ops"}))
        .await;

    assert!(response.error.is_none());
    assert_eq!(response.intent, Intent::PerformanceAnalysis);
    assert_eq!(response.llm_used, "scripted");
    assert_eq!(response.iterations, 1);
    assert_eq!(response.actions_executed, 1);
    assert_eq!(response.observations_made, 1);
    assert_eq!(response.response, "Check the stats");
    // One plan, one final answer.
    assert_eq!(h.llm.calls(), 2);

    let metrics = h.analyst.metrics().await;
    assert_eq!(metrics.total_queries, 1);
    assert_eq!(metrics.successful_responses, 1);
    assert_eq!(metrics.total_actions_executed, 1);
    assert_eq!(metrics.memory_entries_created, 1);

    let entries = h.memory.entries().await;
    let interaction = entries
        .iter()
        .find(|e| e.kind == context_kinds::SUCCESSFUL_INTERACTION)
        .expect("interaction stored");
    let content: serde_json::Value = serde_json::from_str(&interaction.content).unwrap();
    assert_eq!(content["query"], "How is my performance this week?");
    assert_eq!(content["intent"], "performance_analysis");
    assert_eq!(content["success"], true);
    assert_eq!(interaction.metadata["session_id"], response.session_id.as_str());

    let history = h.analyst.conversation_history(10).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].details["user"], "ops");
    assert_eq!(history[1].content, "Check the stats");
}

#[tokio::test]
async fn confident_consensus_is_auto_approved() {
    let h = harness(
        ScriptedLlm::repeating("unused"),
        vec![
            fixed(AgentRole::SentimentAnalyzer, "BULLISH", 0.9),
            fixed(AgentRole::TechnicalAnalyst, "BUY", 0.7),
        ],
    )
    .await;

    let response = h
        .analyst
        .enhanced_analysis("Should I buy SOL right now?", serde_json::json!({}))
        .await;

    let decision = response.trading_decision.as_ref().unwrap();
    assert_eq!(decision.action, TradeAction::Buy);
    assert_eq!(decision.token_symbol, "SOL");
    assert_eq!(decision.amount, dec!(0.1));
    assert!((decision.confidence_score - 0.875).abs() < 1e-9);
    assert_eq!(decision.risk_level, RiskLevel::Low);

    assert!(matches!(
        response.approval,
        Some(ApprovalOutcome::AutoApproved { .. })
    ));
    assert!(response.enhancements_used.multi_agent);
    assert!(response.enhancements_used.human_loop);
    assert!(response.enhancements_used.advanced_confidence);
    assert!(response
        .response
        .starts_with("🤖 **Multi-Agent Analysis**: BUY (confidence: 100.0%)"));
    assert!(response.response.contains("✅ **Auto-Approved**: High confidence (87.5%)"));
    assert!(h.channel.approvals().is_empty());

    let metrics = h.analyst.metrics().await;
    assert_eq!(metrics.multi_agent_analyses, 1);
    assert_eq!(metrics.auto_approvals, 1);
    assert_eq!(metrics.human_approvals_requested, 0);
    assert_eq!(
        h.analyst.approvals().get_approval_stats().await.auto_approved,
        1
    );
}

#[tokio::test]
async fn split_opinion_waits_for_a_person() {
    let h = harness(
        ScriptedLlm::repeating("unused"),
        vec![
            fixed(AgentRole::SentimentAnalyzer, "BULLISH", 0.6),
            fixed(AgentRole::RiskAssessor, "BEARISH", 0.4),
        ],
    )
    .await;

    let response = h
        .analyst
        .enhanced_analysis("buy some RAY?", serde_json::json!({}))
        .await;

    let decision = response.trading_decision.as_ref().unwrap();
    assert_eq!(decision.token_symbol, "RAY");
    assert!((decision.confidence_score - 0.675).abs() < 1e-9);
    assert_eq!(decision.risk_level, RiskLevel::Medium);

    let Some(ApprovalOutcome::Pending { request_id, .. }) = response.approval else {
        panic!("expected a pending approval, got {:?}", response.approval);
    };
    assert!(response
        .response
        .contains(&format!("⏳ **Human Approval Required**: Request {request_id}")));
    assert_eq!(h.channel.approvals().len(), 1);
    assert_eq!(h.analyst.metrics().await.human_approvals_requested, 1);

    let approved = h
        .analyst
        .approvals()
        .approve_request(request_id, "desk")
        .await
        .unwrap();
    assert_eq!(approved.status, ApprovalStatus::Approved);
    assert!(h.analyst.approvals().get_pending_requests().await.is_empty());
}

#[tokio::test]
async fn question_without_trading_intent_makes_no_decision() {
    let h = harness(
        ScriptedLlm::repeating("unused"),
        vec![fixed(AgentRole::SentimentAnalyzer, "NEUTRAL", 0.5)],
    )
    .await;

    let response = h
        .analyst
        .enhanced_analysis("What is the market mood today?", serde_json::json!({}))
        .await;

    assert!(response.trading_decision.is_none());
    assert!(response.approval.is_none());
    assert!(response.enhancements_used.multi_agent);
    assert!(!response.enhancements_used.human_loop);
    assert_eq!(response.intent, Intent::MarketAnalysis);
    assert!(response.response.contains("📊 **Analysis**: What is the market mood today?"));

    let entries = h.memory.entries().await;
    assert!(entries.iter().any(|e| e.kind == context_kinds::ENHANCED_ANALYSIS));
}

#[tokio::test]
async fn without_roles_the_default_confidence_is_used() {
    let h = harness(ScriptedLlm::repeating("unused"), Vec::new()).await;

    let response = h
        .analyst
        .enhanced_analysis("close my position", serde_json::json!({}))
        .await;

    assert!(response.multi_agent_result.is_none());
    assert!(!response.enhancements_used.multi_agent);
    let decision = response.trading_decision.unwrap();
    assert_eq!(decision.action, TradeAction::Hold);
    assert!((decision.confidence_score - 0.675).abs() < 1e-9);
    assert_eq!(h.analyst.metrics().await.multi_agent_analyses, 0);
}

#[tokio::test]
async fn context_fields_reach_the_roles() {
    let technical = Arc::new(FixedAgent::new(AgentRole::TechnicalAnalyst, "HOLD", 0.5));
    let h = harness(ScriptedLlm::repeating("unused"), vec![technical.clone()]).await;

    let response = h
        .analyst
        .enhanced_analysis(
            "trend check",
            serde_json::json!({"price_data": [1.0, 2.0, 3.0], "query": "ignored"}),
        )
        .await;

    // FixedAgent echoes the data it was given.
    let analysis = &response.multi_agent_result.unwrap().individual_analyses[0];
    assert_eq!(analysis.data["price_data"], serde_json::json!([1.0, 2.0, 3.0]));
    assert_eq!(analysis.data["query"], "trend check");
    assert_eq!(analysis.data["market_data"]["volatility"], 0.3);
    assert_eq!(analysis.data["position_data"]["amount"], 0.1);
    assert_eq!(technical.calls(), 1);
}

#[tokio::test]
async fn market_failure_becomes_an_error_response() {
    let broken = StaticMarketData::from_config(&MarketConfig {
        conditions: serde_json::json!("offline"),
        ..MarketConfig::default()
    });
    let h = harness_with_market(ScriptedLlm::repeating("unused"), Vec::new(), broken).await;

    let response = h
        .analyst
        .enhanced_analysis("buy SOL", serde_json::json!({}))
        .await;

    assert!(response.response.starts_with("Analysis failed: "));
    assert!(response.error.is_some());
    let metrics = h.analyst.metrics().await;
    assert_eq!(metrics.total_queries, 1);
    assert_eq!(metrics.successful_responses, 0);
    assert_eq!(h.analyst.status().await.success_rate, 0.0);
}

#[tokio::test]
async fn critical_signal_alerts_and_is_remembered() {
    let h = harness(ScriptedLlm::repeating("unused"), Vec::new()).await;
    let signal = MarketSignal::RiskEvent {
        risk_type: "circuit_breaker".to_string(),
        severity: RiskLevel::Critical,
        description: "Drawdown limit hit".to_string(),
        affected_strategies: vec!["sandwich".to_string()],
        action_taken: "paused".to_string(),
        metadata: serde_json::Value::Null,
    };

    let response = h.analyst.handle_signal(&signal).await;

    assert!(response.error.is_none());
    assert!(response.trading_decision.is_none());
    let alerts = h.channel.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["type"], "risk_event");

    let entries = h.memory.entries().await;
    let stored = entries
        .iter()
        .find(|e| e.kind == context_kinds::MARKET_SIGNAL)
        .expect("signal stored");
    assert_eq!(stored.metadata["event_type"], "risk_event");
    assert_eq!(stored.metadata["critical"], true);
}

#[tokio::test]
async fn opportunity_signal_produces_a_decision() {
    let h = harness(ScriptedLlm::repeating("unused"), Vec::new()).await;
    let signal = MarketSignal::OpportunityDetected {
        token_symbol: "JUP".to_string(),
        opportunity_type: "arbitrage".to_string(),
        confidence: 0.8,
        profit_potential: dec!(0.12),
        risk_score: 0.3,
        venue: "meteora".to_string(),
        metadata: serde_json::Value::Null,
    };

    let response = h.analyst.handle_signal(&signal).await;

    let decision = response.trading_decision.unwrap();
    assert_eq!(decision.action, TradeAction::Buy);
    assert_eq!(decision.token_symbol, "JUP");
    assert!(h.channel.alerts().is_empty());
}

#[tokio::test]
async fn reset_session_keeps_metrics() {
    let h = harness(ScriptedLlm::repeating("Check the stats"), Vec::new()).await;
    h.analyst.analyze("hello", serde_json::json!({})).await;
    let before = h.analyst.session_id().await;

    let after = h.analyst.reset_session().await;

    assert_ne!(before, after);
    assert!(h.analyst.conversation_history(10).await.is_empty());
    assert_eq!(h.analyst.metrics().await.total_queries, 1);
}

#[tokio::test]
async fn history_limit_returns_latest_turns() {
    let h = harness(ScriptedLlm::repeating("Check the stats"), Vec::new()).await;
    for query in ["one", "two", "three"] {
        h.analyst.analyze(query, serde_json::json!({})).await;
    }

    let latest = h.analyst.conversation_history(2).await;
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].content, "three");
    assert_eq!(latest[1].content, "Check the stats");
}

#[tokio::test]
async fn recommendations_follow_stored_performance_data() {
    let h = harness(ScriptedLlm::repeating("Check the stats"), Vec::new()).await;

    let fresh = h.analyst.recommendations().await;
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].kind, "system_health");

    h.analyst
        .analyze("Give me a performance analysis", serde_json::json!({}))
        .await;

    let suggestions = h.analyst.recommendations().await;
    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0].kind, "performance_review");
    assert_eq!(suggestions[1].kind, "system_health");
}

#[tokio::test]
async fn status_and_shutdown() {
    let h = harness(
        ScriptedLlm::repeating("unused"),
        vec![fixed(AgentRole::RiskAssessor, "LOW_RISK", 0.7)],
    )
    .await;
    h.analyst
        .enhanced_analysis("sell JUP", serde_json::json!({}))
        .await;

    let status = h.analyst.status().await;
    assert_eq!(status.status, "active");
    assert_eq!(status.conversation_length, 2);
    assert_eq!(status.components.agent_roles, vec![AgentRole::RiskAssessor]);
    assert!(status.components.workers_running);
    assert!(status.components.tools.contains(&"get_hft_stats".to_string()));
    assert_eq!(status.metrics.total_queries, 1);
    assert_eq!(status.success_rate, 1.0);

    h.analyst.shutdown().await;

    assert!(!h.analyst.coordinator().is_running().await);
    let statuses = h.channel.statuses();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0]["status"], "shutdown");
}
