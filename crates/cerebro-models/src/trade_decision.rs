use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
    ClosePosition,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
            TradeAction::Hold => "hold",
            TradeAction::ClosePosition => "close_position",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per risk tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RiskTable<T> {
    pub low: T,
    pub medium: T,
    pub high: T,
    pub critical: T,
}

impl<T: Copy> RiskTable<T> {
    pub fn get(&self, level: RiskLevel) -> T {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
            RiskLevel::Critical => self.critical,
        }
    }
}

/// A proposed trading action awaiting possible approval.
///
/// Only `risk_level` may change after construction, and only before an
/// approval is requested for the decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradingDecision {
    pub id: Uuid,
    pub strategy_type: String,
    pub action: TradeAction,
    pub token_symbol: String,
    /// Positive quantity of the traded token.
    pub amount: Decimal,
    /// 0.0 to 1.0.
    pub confidence_score: f64,
    pub risk_level: RiskLevel,
    pub reasoning: String,
    pub market_conditions_snapshot: serde_json::Value,
    pub estimated_profit: Option<Decimal>,
    pub max_loss: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Track record used to temper a strategy's raw confidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalPerformance {
    pub success_rate: f64,
    #[serde(default)]
    pub average_profit: f64,
    #[serde(default)]
    pub max_drawdown: f64,
    #[serde(default)]
    pub total_trades: u64,
}
