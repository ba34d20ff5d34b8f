use std::collections::HashMap;

use async_trait::async_trait;
use cerebro_models::agent_message::{AgentAnalysis, AgentRole};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::agent::AnalysisAgent;
use crate::error::AgentError;

const POSITION_WEIGHT: f64 = 0.30;
const VOLATILITY_WEIGHT: f64 = 0.25;
const LIQUIDITY_WEIGHT: f64 = 0.20;
const CONCENTRATION_WEIGHT: f64 = 0.15;
const MARKET_WEIGHT: f64 = 0.10;

fn half() -> f64 {
    0.5
}

fn default_portfolio_total() -> f64 {
    8.0
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RiskInput {
    position_data: Position,
    market_data: RiskMarket,
    portfolio_data: Portfolio,
}

#[derive(Debug, Default, Deserialize)]
struct Position {
    #[serde(default, alias = "amount_sol")]
    amount: f64,
}

#[derive(Debug, Deserialize)]
struct RiskMarket {
    #[serde(default = "half")]
    volatility: f64,
    #[serde(default = "half")]
    liquidity_score: f64,
    #[serde(default)]
    trend_strength: f64,
}

impl Default for RiskMarket {
    fn default() -> Self {
        Self {
            volatility: 0.5,
            liquidity_score: 0.5,
            trend_strength: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Portfolio {
    #[serde(default = "default_portfolio_total", alias = "total_sol")]
    total: f64,
    #[serde(default)]
    token_concentration: HashMap<String, f64>,
}

impl Default for Portfolio {
    fn default() -> Self {
        Self {
            total: default_portfolio_total(),
            token_concentration: HashMap::new(),
        }
    }
}

/// The five normalized sub-metrics feeding the weighted risk score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskMetrics {
    pub position_risk: f64,
    pub volatility_risk: f64,
    pub liquidity_risk: f64,
    pub concentration_risk: f64,
    pub market_risk: f64,
}

impl RiskMetrics {
    pub fn score(&self) -> f64 {
        self.position_risk * POSITION_WEIGHT
            + self.volatility_risk * VOLATILITY_WEIGHT
            + self.liquidity_risk * LIQUIDITY_WEIGHT
            + self.concentration_risk * CONCENTRATION_WEIGHT
            + self.market_risk * MARKET_WEIGHT
    }
}

/// Maps a weighted risk score to its label and the confidence reported with it.
pub fn risk_band(score: f64) -> (&'static str, f64) {
    if score > 0.8 {
        ("HIGH_RISK", 0.9)
    } else if score > 0.6 {
        ("MEDIUM_RISK", 0.8)
    } else if score > 0.4 {
        ("LOW_RISK", 0.7)
    } else {
        ("MINIMAL_RISK", 0.8)
    }
}

/// Weighted exposure/volatility/liquidity/concentration/trend risk score.
#[derive(Debug, Default, Clone)]
pub struct RiskAssessor;

impl RiskAssessor {
    pub fn new() -> Self {
        Self
    }
}

fn metrics(input: &RiskInput) -> Result<RiskMetrics, AgentError> {
    if input.portfolio_data.total <= 0.0 {
        return Err(AgentError::InvalidInput(format!(
            "portfolio total must be positive, got {}",
            input.portfolio_data.total
        )));
    }

    let max_concentration = input
        .portfolio_data
        .token_concentration
        .values()
        .copied()
        .fold(0.0, f64::max);

    Ok(RiskMetrics {
        position_risk: input.position_data.amount / input.portfolio_data.total,
        volatility_risk: input.market_data.volatility,
        liquidity_risk: 1.0 - input.market_data.liquidity_score,
        concentration_risk: max_concentration,
        market_risk: (input.market_data.trend_strength - 0.5).abs() * 2.0,
    })
}

#[async_trait]
impl AnalysisAgent for RiskAssessor {
    fn role(&self) -> AgentRole {
        AgentRole::RiskAssessor
    }

    fn analysis_type(&self) -> &str {
        "risk_assessment"
    }

    fn fallback_recommendation(&self) -> &str {
        "UNKNOWN_RISK"
    }

    async fn analyze(&self, data: &serde_json::Value) -> Result<AgentAnalysis, AgentError> {
        let input: RiskInput = serde_json::from_value(data.clone())
            .map_err(|e| AgentError::InvalidInput(format!("risk input: {e}")))?;
        let metrics = metrics(&input)?;
        let score = metrics.score();
        let (label, confidence) = risk_band(score);

        let mut data = serde_json::to_value(metrics)?;
        data["risk_score"] = serde_json::json!(score);

        Ok(AgentAnalysis {
            agent_role: self.role(),
            analysis_type: self.analysis_type().to_string(),
            confidence,
            recommendation: label.to_string(),
            data,
            reasoning: format!(
                "Risk assessment based on portfolio exposure, volatility, and market conditions. Risk score: {score:.2}"
            ),
            created_at: Utc::now(),
        })
    }
}
