use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::agent_message::AgentRole;
use crate::trade_decision::{HistoricalPerformance, RiskTable};

/// Top-level configuration for Cerebro.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CerebroConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub approval: ApprovalConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub trading: TradingConfig,
}

/// Configuration for the orchestration loop and the analysis roles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Upper bound on plan/act/observe/decide iterations per query.
    pub max_iterations: u32,
    /// Model used for planning and final responses.
    pub model: String,
    /// Per-call timeout for the language model in seconds.
    pub llm_timeout_seconds: u64,
    /// How long the coordinator waits for role analyses in seconds.
    pub collaboration_timeout_seconds: u64,
    pub roles: Vec<RoleConfig>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            model: "claude-3-5-haiku-latest".to_string(),
            llm_timeout_seconds: 60,
            collaboration_timeout_seconds: 30,
            roles: vec![
                RoleConfig {
                    role: AgentRole::SentimentAnalyzer,
                    enabled: true,
                },
                RoleConfig {
                    role: AgentRole::TechnicalAnalyst,
                    enabled: true,
                },
                RoleConfig {
                    role: AgentRole::RiskAssessor,
                    enabled: true,
                },
            ],
        }
    }
}

/// Whether a built-in analysis role takes part in collaborative analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleConfig {
    pub role: AgentRole,
    pub enabled: bool,
}

/// Risk-tiered approval policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Minimum confidence at which a decision skips manual approval.
    pub auto_approval_thresholds: RiskTable<f64>,
    /// How long a pending request stays open, per tier, in seconds.
    pub timeouts_seconds: RiskTable<u64>,
    /// Poll interval used by `wait_for_approval`.
    pub poll_interval_ms: u64,
    /// Interval of the background expiry sweep in seconds.
    pub sweep_interval_seconds: u64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            auto_approval_thresholds: RiskTable {
                low: 0.85,
                medium: 0.95,
                high: 1.0,
                critical: 1.0,
            },
            timeouts_seconds: RiskTable {
                low: 300,
                medium: 600,
                high: 1800,
                critical: 3600,
            },
            poll_interval_ms: 1000,
            sweep_interval_seconds: 30,
        }
    }
}

/// Configuration for the memory store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MemoryConfig {
    /// Path to the SQLite memory database. `:memory:` keeps it in-process.
    pub sqlite_path: String,
    /// Maximum number of cached search results in the moka hot cache.
    pub cache_max_capacity: u64,
    /// How long a cached search result stays valid in seconds.
    pub cache_ttl_seconds: u64,
    /// Number of context entries retrieved when planning.
    pub search_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/cerebro_memory.db".to_string(),
            cache_max_capacity: 1_000,
            cache_ttl_seconds: 60,
            search_limit: 5,
        }
    }
}

/// Static snapshot served by the reference market data source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarketConfig {
    pub conditions: serde_json::Value,
    pub portfolio: serde_json::Value,
    pub historical: HistoricalPerformance,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            conditions: serde_json::json!({
                "volatility": 0.3,
                "liquidity_score": 0.7,
                "trend_strength": 0.6,
                "price_change_24h": 0.02,
                "volume_change_24h": 0.15
            }),
            portfolio: serde_json::json!({
                "total": 8.0,
                "available": 6.5,
                "token_concentration": {"SOL": 0.8, "USDC": 0.2}
            }),
            historical: HistoricalPerformance {
                success_rate: 0.75,
                average_profit: 0.03,
                max_drawdown: 0.15,
                total_trades: 150,
            },
        }
    }
}

/// Defaults applied when turning an analysis into a trading decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TradingConfig {
    pub default_amount: Decimal,
    pub default_token: String,
    pub known_tokens: Vec<String>,
    pub strategy_type: String,
    /// Estimated profit as a fraction of the amount.
    pub estimated_profit_rate: Decimal,
    /// Maximum loss as a fraction of the amount.
    pub max_loss_rate: Decimal,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_amount: Decimal::new(1, 1),
            default_token: "SOL".to_string(),
            known_tokens: ["SOL", "USDC", "RAY", "ORCA", "JUP"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            strategy_type: "manual_analysis".to_string(),
            estimated_profit_rate: Decimal::new(5, 2),
            max_loss_rate: Decimal::new(10, 2),
        }
    }
}
