use cerebro_models::trade_decision::{HistoricalPerformance, RiskLevel, TradingDecision};
use rust_decimal::Decimal;

/// Strategies that compete for block ordering carry extra execution risk.
const MEV_STRATEGIES: &[&str] = &["sandwich", "liquidation"];

/// Position size above which a trade is high risk regardless of confidence.
fn max_low_risk_amount() -> Decimal {
    Decimal::new(2, 0)
}

/// Loss above which a trade is high risk.
fn max_low_risk_loss() -> Decimal {
    Decimal::new(5, 1)
}

/// Risk tier of a decision. Rules are checked in order and the first match wins.
pub fn assess_trading_risk(decision: &TradingDecision) -> RiskLevel {
    if decision.amount > max_low_risk_amount() {
        return RiskLevel::High;
    }

    if decision.confidence_score < 0.6 {
        return RiskLevel::High;
    }
    if decision.confidence_score < 0.8 {
        return RiskLevel::Medium;
    }

    if decision
        .max_loss
        .is_some_and(|loss| loss > max_low_risk_loss())
    {
        return RiskLevel::High;
    }

    if MEV_STRATEGIES.contains(&decision.strategy_type.as_str()) {
        return RiskLevel::Medium;
    }

    RiskLevel::Low
}

/// Temper a strategy's raw confidence by market conditions and track record.
///
/// High volatility (> 0.8) scales by 0.8 and thin liquidity (< 0.3) by 0.7.
/// With a track record, the result is averaged with its success rate.
/// Always returns a value in `[0, 1]`.
pub fn calculate_confidence_score(
    base: f64,
    market_conditions: &serde_json::Value,
    historical: Option<&HistoricalPerformance>,
) -> f64 {
    let reading = |key: &str| {
        market_conditions
            .get(key)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.5)
    };

    let mut confidence = base;
    if reading("volatility") > 0.8 {
        confidence *= 0.8;
    }
    if reading("liquidity_score") < 0.3 {
        confidence *= 0.7;
    }
    if let Some(history) = historical {
        confidence = (confidence + history.success_rate) / 2.0;
    }

    if confidence.is_nan() {
        return 0.0;
    }
    confidence.clamp(0.0, 1.0)
}
