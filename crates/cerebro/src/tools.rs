use std::sync::Arc;

use async_trait::async_trait;
use cerebro_agents::{AgentError, Tool, ToolKind};

use crate::market::MarketDataSource;

/// `get_market_sentiment`: the current market conditions snapshot.
pub struct MarketConditionsTool {
    market: Arc<dyn MarketDataSource>,
}

impl MarketConditionsTool {
    pub fn new(market: Arc<dyn MarketDataSource>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for MarketConditionsTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GetMarketSentiment
    }

    async fn call(&self, _input: &serde_json::Value) -> Result<serde_json::Value, AgentError> {
        self.market
            .market_conditions()
            .await
            .map_err(|e| AgentError::Tool(e.to_string()))
    }
}

/// `get_hft_stats`: portfolio snapshot plus the strategy track record.
pub struct TradingStatsTool {
    market: Arc<dyn MarketDataSource>,
}

impl TradingStatsTool {
    pub fn new(market: Arc<dyn MarketDataSource>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for TradingStatsTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GetHftStats
    }

    async fn call(&self, _input: &serde_json::Value) -> Result<serde_json::Value, AgentError> {
        let portfolio = self
            .market
            .portfolio()
            .await
            .map_err(|e| AgentError::Tool(e.to_string()))?;
        let performance = self
            .market
            .historical_performance()
            .await
            .map_err(|e| AgentError::Tool(e.to_string()))?;
        Ok(serde_json::json!({
            "portfolio": portfolio,
            "performance": performance,
        }))
    }
}
