use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a participant on the message bus.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    SentimentAnalyzer,
    TechnicalAnalyst,
    RiskAssessor,
    StrategyCoordinator,
    ActionExecutor,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::SentimentAnalyzer => "sentiment_analyzer",
            AgentRole::TechnicalAnalyst => "technical_analyst",
            AgentRole::RiskAssessor => "risk_assessor",
            AgentRole::StrategyCoordinator => "strategy_coordinator",
            AgentRole::ActionExecutor => "action_executor",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    AnalysisRequest,
    AnalysisResult,
    ConsensusRequest,
    ConsensusResponse,
    ActionProposal,
    ActionApproval,
    StatusUpdate,
}

/// A unit of bus traffic. Immutable once sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentMessage {
    pub id: Uuid,
    pub sender_role: AgentRole,
    /// `None` means broadcast to every registered role except the sender.
    pub recipient_role: Option<AgentRole>,
    pub message_type: MessageType,
    pub payload: serde_json::Value,
    pub correlation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl AgentMessage {
    pub fn new(
        sender_role: AgentRole,
        recipient_role: Option<AgentRole>,
        message_type: MessageType,
        payload: serde_json::Value,
        correlation_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_role,
            recipient_role,
            message_type,
            payload,
            correlation_id,
            created_at: Utc::now(),
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.recipient_role.is_none()
    }
}

/// One role's opinion on a piece of input data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentAnalysis {
    pub agent_role: AgentRole,
    pub analysis_type: String,
    /// 0.0 to 1.0.
    pub confidence: f64,
    /// Free-form label such as `BUY`, `SELL`, `HOLD`, `BULLISH`, `BEARISH`, `NEUTRAL`.
    pub recommendation: String,
    pub data: serde_json::Value,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
}

impl AgentAnalysis {
    /// A zero-confidence analysis standing in for a role that failed.
    pub fn failed(
        agent_role: AgentRole,
        analysis_type: &str,
        recommendation: &str,
        error: &str,
    ) -> Self {
        Self {
            agent_role,
            analysis_type: analysis_type.to_string(),
            confidence: 0.0,
            recommendation: recommendation.to_string(),
            data: serde_json::json!({ "error": error }),
            reasoning: format!("Analysis failed: {error}"),
            created_at: Utc::now(),
        }
    }
}

/// The three buckets analyses are voted into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

impl Recommendation {
    /// Map a role's free-form label onto a voting bucket.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "BUY" | "BULLISH" => Recommendation::Buy,
            "SELL" | "BEARISH" => Recommendation::Sell,
            _ => Recommendation::Hold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Buy => "BUY",
            Recommendation::Sell => "SELL",
            Recommendation::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Total confidence accumulated per bucket.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct VoteWeights {
    pub buy: f64,
    pub sell: f64,
    pub hold: f64,
}

impl VoteWeights {
    pub fn total(&self) -> f64 {
        self.buy + self.sell + self.hold
    }
}

/// Weighted-vote reduction of several analyses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Synthesis {
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub reasoning: String,
    pub agent_count: usize,
    pub weights: VoteWeights,
}

/// Output of one collaborative pass: per-role opinions plus their synthesis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollaborativeResult {
    pub individual_analyses: Vec<AgentAnalysis>,
    pub synthesis: Synthesis,
    pub created_at: DateTime<Utc>,
}
