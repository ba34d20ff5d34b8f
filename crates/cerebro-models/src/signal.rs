use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::trade_decision::RiskLevel;

/// An external event pushed in by the trading engine, handled like a user query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum MarketSignal {
    /// A trading opportunity was detected.
    OpportunityDetected {
        token_symbol: String,
        opportunity_type: String,
        confidence: f64,
        profit_potential: Decimal,
        risk_score: f64,
        venue: String,
        #[serde(default)]
        metadata: serde_json::Value,
    },
    /// A trade finished executing.
    ExecutionResult {
        transaction_id: String,
        strategy: String,
        token_symbol: String,
        outcome: String,
        pnl: Decimal,
        execution_time_ms: u64,
        #[serde(default)]
        metadata: serde_json::Value,
    },
    /// The risk layer tripped a guard.
    RiskEvent {
        risk_type: String,
        severity: RiskLevel,
        description: String,
        #[serde(default)]
        affected_strategies: Vec<String>,
        action_taken: String,
        #[serde(default)]
        metadata: serde_json::Value,
    },
    /// A tracked wallet did something notable.
    WalletEvent {
        wallet_address: String,
        event_subtype: String,
        token_symbol: Option<String>,
        amount: Option<Decimal>,
        confidence: f64,
        #[serde(default)]
        metadata: serde_json::Value,
    },
}

impl MarketSignal {
    pub fn event_type(&self) -> &'static str {
        match self {
            MarketSignal::OpportunityDetected { .. } => "opportunity_detected",
            MarketSignal::ExecutionResult { .. } => "execution_result",
            MarketSignal::RiskEvent { .. } => "risk_event",
            MarketSignal::WalletEvent { .. } => "wallet_event",
        }
    }

    /// Natural-language query the orchestrator analyzes for this signal.
    pub fn to_query(&self) -> String {
        match self {
            MarketSignal::OpportunityDetected {
                token_symbol,
                opportunity_type,
                confidence,
                profit_potential,
                venue,
                ..
            } => format!(
                "Evaluate {opportunity_type} trade opportunity to buy {token_symbol} on {venue}: \
                 confidence {confidence:.2}, profit potential {profit_potential}"
            ),
            MarketSignal::ExecutionResult {
                strategy,
                token_symbol,
                outcome,
                pnl,
                ..
            } => format!(
                "Review {strategy} strategy execution on {token_symbol}: outcome {outcome}, pnl {pnl}"
            ),
            MarketSignal::RiskEvent {
                risk_type,
                severity,
                description,
                action_taken,
                ..
            } => format!(
                "Assess {severity} {risk_type} risk event: {description} (action taken: {action_taken})"
            ),
            MarketSignal::WalletEvent {
                wallet_address,
                event_subtype,
                token_symbol,
                ..
            } => match token_symbol {
                Some(token) => format!(
                    "Analyze wallet {wallet_address} {event_subtype} activity in {token} and whether to trade"
                ),
                None => format!("Analyze wallet {wallet_address} {event_subtype} activity"),
            },
        }
    }

    /// Critical risk events bypass normal queueing in the caller.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            MarketSignal::RiskEvent {
                severity: RiskLevel::Critical,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn deserialize_tagged_opportunity() {
        let json = r#"{
            "event_type": "opportunity_detected",
            "token_symbol": "RAY",
            "opportunity_type": "arbitrage",
            "confidence": 0.8,
            "profit_potential": "0.12",
            "risk_score": 0.3,
            "venue": "raydium"
        }"#;
        let signal: MarketSignal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.event_type(), "opportunity_detected");
        let query = signal.to_query();
        assert!(query.contains("buy RAY"));
        assert!(query.contains("arbitrage"));
    }

    #[test]
    fn roundtrip_risk_event() {
        let signal = MarketSignal::RiskEvent {
            risk_type: "circuit_breaker".to_string(),
            severity: RiskLevel::Critical,
            description: "Drawdown limit hit".to_string(),
            affected_strategies: vec!["sandwich".to_string()],
            action_taken: "paused".to_string(),
            metadata: serde_json::Value::Null,
        };
        let json = serde_json::to_string(&signal).unwrap();
        let parsed: MarketSignal = serde_json::from_str(&json).unwrap();
        assert_eq!(signal, parsed);
        assert!(parsed.is_critical());
    }

    #[test]
    fn wallet_event_without_token() {
        let signal = MarketSignal::WalletEvent {
            wallet_address: "7xKX".to_string(),
            event_subtype: "large_trade".to_string(),
            token_symbol: None,
            amount: Some(dec!(12.5)),
            confidence: 0.7,
            metadata: serde_json::Value::Null,
        };
        assert_eq!(signal.to_query(), "Analyze wallet 7xKX large_trade activity");
        assert!(!signal.is_critical());
    }
}
