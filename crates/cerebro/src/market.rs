use async_trait::async_trait;
use cerebro_models::config::MarketConfig;
use cerebro_models::trade_decision::HistoricalPerformance;

use crate::error::AnalystError;

/// Source of the market, portfolio and track-record snapshots fed to the
/// analysis roles and to confidence scoring.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Current conditions: `volatility`, `liquidity_score`, `trend_strength`,
    /// `price_change_24h`, `volume_change_24h`.
    async fn market_conditions(&self) -> Result<serde_json::Value, AnalystError>;

    async fn portfolio(&self) -> Result<serde_json::Value, AnalystError>;

    async fn historical_performance(&self) -> Result<HistoricalPerformance, AnalystError>;
}

/// Serves the fixed snapshot from `[market]`.
#[derive(Debug, Clone)]
pub struct StaticMarketData {
    config: MarketConfig,
}

impl StaticMarketData {
    pub fn from_config(config: &MarketConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Default for StaticMarketData {
    fn default() -> Self {
        Self::from_config(&MarketConfig::default())
    }
}

#[async_trait]
impl MarketDataSource for StaticMarketData {
    async fn market_conditions(&self) -> Result<serde_json::Value, AnalystError> {
        if !self.config.conditions.is_object() {
            return Err(AnalystError::Market(
                "market conditions must be a table".to_string(),
            ));
        }
        Ok(self.config.conditions.clone())
    }

    async fn portfolio(&self) -> Result<serde_json::Value, AnalystError> {
        Ok(self.config.portfolio.clone())
    }

    async fn historical_performance(&self) -> Result<HistoricalPerformance, AnalystError> {
        Ok(self.config.historical.clone())
    }
}
