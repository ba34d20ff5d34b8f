use cerebro_approval::{assess_trading_risk, calculate_confidence_score};
use cerebro_models::agent_message::{CollaborativeResult, Synthesis};
use cerebro_models::config::TradingConfig;
use cerebro_models::trade_decision::{HistoricalPerformance, RiskLevel, TradeAction, TradingDecision};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TRADING_KEYWORDS: &[&str] = &["buy", "sell", "trade", "position", "strategy"];

/// Confidence used when no collaborative synthesis is available.
const DEFAULT_BASE_CONFIDENCE: f64 = 0.6;

/// How an approval request ended up when the analysis returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApprovalOutcome {
    Pending {
        request_id: Uuid,
        expires_at: DateTime<Utc>,
    },
    AutoApproved {
        request_id: Uuid,
        confidence: f64,
    },
}

pub fn has_trading_intent(query: &str) -> bool {
    let lower = query.to_lowercase();
    TRADING_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn trade_action(lower: &str) -> TradeAction {
    if lower.contains("buy") {
        TradeAction::Buy
    } else if lower.contains("sell") {
        TradeAction::Sell
    } else {
        TradeAction::Hold
    }
}

/// The first configured token the query mentions, in configuration order.
fn mentioned_token<'a>(lower: &str, known: &'a [String]) -> Option<&'a str> {
    known
        .iter()
        .find(|t| lower.contains(&t.to_lowercase()))
        .map(String::as_str)
}

/// Turn a query with trading intent into a sized, scored and risk-tiered decision.
/// Queries without trading intent yield `None`.
pub fn build_decision(
    query: &str,
    synthesis: Option<&Synthesis>,
    market_conditions: &serde_json::Value,
    historical: &HistoricalPerformance,
    trading: &TradingConfig,
) -> Option<TradingDecision> {
    if !has_trading_intent(query) {
        return None;
    }
    let lower = query.to_lowercase();

    let token = mentioned_token(&lower, &trading.known_tokens)
        .unwrap_or(trading.default_token.as_str());
    let base = synthesis
        .map(|s| s.confidence)
        .unwrap_or(DEFAULT_BASE_CONFIDENCE);
    let amount: Decimal = trading.default_amount;

    let mut decision = TradingDecision {
        id: Uuid::new_v4(),
        strategy_type: trading.strategy_type.clone(),
        action: trade_action(&lower),
        token_symbol: token.to_string(),
        amount,
        confidence_score: calculate_confidence_score(base, market_conditions, Some(historical)),
        risk_level: RiskLevel::Low,
        reasoning: format!("Analysis based on query: {query}"),
        market_conditions_snapshot: market_conditions.clone(),
        estimated_profit: Some(amount * trading.estimated_profit_rate),
        max_loss: Some(amount * trading.max_loss_rate),
        created_at: Utc::now(),
    };
    decision.risk_level = assess_trading_risk(&decision);
    Some(decision)
}

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Plain-text report of the collaborative analysis, decision and approval state.
pub fn render_enhanced_response(
    query: &str,
    collaboration: Option<&CollaborativeResult>,
    decision: Option<&TradingDecision>,
    approval: Option<&ApprovalOutcome>,
) -> String {
    let mut lines = Vec::new();

    if let Some(result) = collaboration {
        lines.push(format!(
            "🤖 **Multi-Agent Analysis**: {} (confidence: {})",
            result.synthesis.recommendation,
            percent(result.synthesis.confidence)
        ));
        for analysis in &result.individual_analyses {
            lines.push(format!(
                "  • {}: {} ({})",
                analysis.agent_role,
                analysis.recommendation,
                percent(analysis.confidence)
            ));
        }
    }

    if let Some(decision) = decision {
        lines.push(format!(
            "\n💡 **Trading Decision**: {} {:.3} {}",
            decision.action.as_str().to_uppercase(),
            decision.amount,
            decision.token_symbol
        ));
        lines.push(format!("  • Confidence: {}", percent(decision.confidence_score)));
        lines.push(format!(
            "  • Risk Level: {}",
            decision.risk_level.as_str().to_uppercase()
        ));
        if let Some(profit) = decision.estimated_profit {
            lines.push(format!("  • Est. Profit: {profit:.3} SOL"));
        }
    }

    match approval {
        Some(ApprovalOutcome::Pending {
            request_id,
            expires_at,
        }) => {
            lines.push(format!("\n⏳ **Human Approval Required**: Request {request_id}"));
            lines.push(format!("  • Expires: {}", expires_at.to_rfc3339()));
        }
        Some(ApprovalOutcome::AutoApproved { confidence, .. }) => {
            lines.push(format!(
                "\n✅ **Auto-Approved**: High confidence ({})",
                percent(*confidence)
            ));
        }
        None => {}
    }

    lines.push(format!("\n📊 **Analysis**: {query}"));
    if let Some(result) = collaboration {
        if !result.synthesis.reasoning.is_empty() {
            lines.push(format!("  • {}", result.synthesis.reasoning));
        }
    }

    lines.join("\n")
}
