pub mod agent_message;
pub mod approval;
pub mod config;
pub mod memory_schema;
pub mod session;
pub mod signal;
pub mod trade_decision;

pub use agent_message::{
    AgentAnalysis, AgentMessage, AgentRole, CollaborativeResult, MessageType, Recommendation,
    Synthesis, VoteWeights,
};
pub use approval::{ApprovalRequest, ApprovalStats, ApprovalStatus};
pub use config::{
    AgentConfig, ApprovalConfig, CerebroConfig, MarketConfig, MemoryConfig, RoleConfig,
    TradingConfig,
};
pub use memory_schema::{MemoryContext, MemoryRow};
pub use session::{
    ActionBatch, ActionRecord, FlowMetadata, FlowOutcome, Observation, OrchestrationSession,
    ToolCall,
};
pub use signal::MarketSignal;
pub use trade_decision::{HistoricalPerformance, RiskLevel, RiskTable, TradeAction, TradingDecision};
