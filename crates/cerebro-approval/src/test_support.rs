//! Fixtures for approval tests: a notification channel that records what it is
//! sent and decision/request builders.

use std::sync::Mutex;

use async_trait::async_trait;
use cerebro_models::approval::{ApprovalRequest, ApprovalStatus};
use cerebro_models::trade_decision::{RiskLevel, TradeAction, TradingDecision};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::NotificationError;
use crate::notification::NotificationChannel;

/// Keeps every notification it receives. A failing channel records nothing.
pub struct RecordingChannel {
    name: String,
    fail: bool,
    approvals: Mutex<Vec<ApprovalRequest>>,
    alerts: Mutex<Vec<serde_json::Value>>,
    statuses: Mutex<Vec<serde_json::Value>>,
}

impl RecordingChannel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
            approvals: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            statuses: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    pub fn approvals(&self) -> Vec<ApprovalRequest> {
        self.approvals.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn alerts(&self) -> Vec<serde_json::Value> {
        self.alerts.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn statuses(&self) -> Vec<serde_json::Value> {
        self.statuses.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn push<T>(&self, store: &Mutex<Vec<T>>, item: T) -> Result<(), NotificationError> {
        if self.fail {
            return Err(NotificationError::Transport(format!("{} is down", self.name)));
        }
        store
            .lock()
            .map_err(|e| NotificationError::Transport(e.to_string()))?
            .push(item);
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_approval_request(&self, request: &ApprovalRequest) -> Result<(), NotificationError> {
        self.push(&self.approvals, request.clone())
    }

    async fn send_trading_alert(&self, alert: &serde_json::Value) -> Result<(), NotificationError> {
        self.push(&self.alerts, alert.clone())
    }

    async fn send_system_status(&self, status: &serde_json::Value) -> Result<(), NotificationError> {
        self.push(&self.statuses, status.clone())
    }
}

/// A 0.5 SOL buy at the given tier and confidence.
pub fn sample_decision(risk_level: RiskLevel, confidence: f64) -> TradingDecision {
    TradingDecision {
        id: Uuid::new_v4(),
        strategy_type: "arbitrage".to_string(),
        action: TradeAction::Buy,
        token_symbol: "SOL".to_string(),
        amount: Decimal::new(5, 1),
        confidence_score: confidence,
        risk_level,
        reasoning: "Spread between venues above fees".to_string(),
        market_conditions_snapshot: serde_json::json!({"volatility": 0.3}),
        estimated_profit: None,
        max_loss: Some(Decimal::new(5, 2)),
        created_at: Utc::now(),
    }
}

/// A pending medium-risk request expiring in ten minutes.
pub fn sample_request() -> ApprovalRequest {
    let now = Utc::now();
    ApprovalRequest {
        id: Uuid::new_v4(),
        decision: sample_decision(RiskLevel::Medium, 0.7),
        status: ApprovalStatus::Pending,
        created_at: now,
        expires_at: now + Duration::seconds(600),
        approved_by: None,
        approved_at: None,
        rejection_reason: None,
        notification_sent: false,
    }
}
