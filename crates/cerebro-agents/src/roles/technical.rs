use async_trait::async_trait;
use cerebro_models::agent_message::{AgentAnalysis, AgentRole};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::agent::AnalysisAgent;
use crate::error::AgentError;

/// Only the most recent prices feed the indicators.
const LOOKBACK: usize = 50;
const RSI_PERIOD: usize = 14;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TechnicalInput {
    #[serde(alias = "prices")]
    price_data: Vec<serde_json::Value>,
    volume_data: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicators {
    pub sma_20: f64,
    pub sma_50: f64,
    pub current_price: f64,
    pub rsi: f64,
    pub macd: Macd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub indicator: &'static str,
    pub direction: Direction,
    pub strength: f64,
}

/// SMA/RSI/MACD signals voted into BUY, SELL or HOLD.
#[derive(Debug, Default, Clone)]
pub struct TechnicalAnalyst;

impl TechnicalAnalyst {
    pub fn new() -> Self {
        Self
    }
}

fn parse_price(value: &serde_json::Value) -> Result<f64, AgentError> {
    let price = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    price
        .filter(|p| p.is_finite())
        .ok_or_else(|| AgentError::InvalidInput(format!("non-numeric price: {value}")))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// RSI over the last 14 price changes; neutral 50 on short series.
pub fn rsi(prices: &[f64]) -> f64 {
    if prices.len() < RSI_PERIOD {
        return 50.0;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let recent = &changes[changes.len().saturating_sub(RSI_PERIOD)..];
    let avg_gain = recent.iter().filter(|c| **c > 0.0).sum::<f64>() / RSI_PERIOD as f64;
    let avg_loss = recent.iter().filter(|c| **c < 0.0).map(|c| -c).sum::<f64>() / RSI_PERIOD as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

fn ema(prices: &[f64], period: usize) -> f64 {
    let alpha = 2.0 / (period as f64 + 1.0);
    prices
        .iter()
        .skip(1)
        .fold(prices[0], |acc, p| alpha * p + (1.0 - alpha) * acc)
}

/// EMA12 - EMA26 with the signal line approximated as 0.9 of the MACD line.
pub fn macd(prices: &[f64]) -> Macd {
    if prices.len() < 26 {
        return Macd {
            macd: 0.0,
            signal: 0.0,
            histogram: 0.0,
        };
    }
    let line = ema(prices, 12) - ema(prices, 26);
    let signal = line * 0.9;
    Macd {
        macd: line,
        signal,
        histogram: line - signal,
    }
}

/// Indicators over the lookback window. An empty series reads as zero prices with a
/// neutral RSI.
pub fn indicators(prices: &[f64]) -> Indicators {
    let prices = &prices[prices.len().saturating_sub(LOOKBACK)..];
    let Some(&current_price) = prices.last() else {
        return Indicators {
            sma_20: 0.0,
            sma_50: 0.0,
            current_price: 0.0,
            rsi: 50.0,
            macd: macd(prices),
        };
    };
    let sma_20 = if prices.len() >= 20 {
        mean(&prices[prices.len() - 20..])
    } else {
        current_price
    };

    Indicators {
        sma_20,
        sma_50: mean(prices),
        current_price,
        rsi: rsi(prices),
        macd: macd(prices),
    }
}

pub fn signals(ind: &Indicators) -> Vec<Signal> {
    let sma = if ind.current_price > ind.sma_20 {
        Direction::Bullish
    } else {
        Direction::Bearish
    };

    let (rsi, rsi_strength) = if ind.rsi < 30.0 {
        (Direction::Bullish, 0.8)
    } else if ind.rsi > 70.0 {
        (Direction::Bearish, 0.8)
    } else {
        (Direction::Neutral, 0.3)
    };

    let macd = if ind.macd.histogram > 0.0 {
        Direction::Bullish
    } else {
        Direction::Bearish
    };

    vec![
        Signal {
            indicator: "SMA",
            direction: sma,
            strength: 0.6,
        },
        Signal {
            indicator: "RSI",
            direction: rsi,
            strength: rsi_strength,
        },
        Signal {
            indicator: "MACD",
            direction: macd,
            strength: 0.7,
        },
    ]
}

#[async_trait]
impl AnalysisAgent for TechnicalAnalyst {
    fn role(&self) -> AgentRole {
        AgentRole::TechnicalAnalyst
    }

    fn analysis_type(&self) -> &str {
        "technical_analysis"
    }

    async fn analyze(&self, data: &serde_json::Value) -> Result<AgentAnalysis, AgentError> {
        let input: TechnicalInput = serde_json::from_value(data.clone())
            .map_err(|e| AgentError::InvalidInput(format!("technical input: {e}")))?;

        let prices = input
            .price_data
            .iter()
            .map(parse_price)
            .collect::<Result<Vec<_>, _>>()?;

        let ind = indicators(&prices);
        let signals = signals(&ind);
        let bullish = signals.iter().filter(|s| s.direction == Direction::Bullish).count();
        let bearish = signals.iter().filter(|s| s.direction == Direction::Bearish).count();
        let total = signals.len() as f64;

        let (recommendation, confidence) = match bullish.cmp(&bearish) {
            std::cmp::Ordering::Greater => ("BUY", bullish as f64 / total),
            std::cmp::Ordering::Less => ("SELL", bearish as f64 / total),
            std::cmp::Ordering::Equal => ("HOLD", 0.5),
        };

        Ok(AgentAnalysis {
            agent_role: self.role(),
            analysis_type: self.analysis_type().to_string(),
            confidence,
            recommendation: recommendation.to_string(),
            data: serde_json::json!({
                "indicators": ind,
                "signals": signals,
                "bullish_signals": bullish,
                "bearish_signals": bearish,
                "volume_points": input.volume_data.len(),
            }),
            reasoning: format!(
                "Technical analysis based on {} indicators. {bullish} bullish, {bearish} bearish signals.",
                signals.len()
            ),
            created_at: Utc::now(),
        })
    }
}
