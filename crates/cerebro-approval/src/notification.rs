use std::sync::Arc;

use async_trait::async_trait;
use cerebro_models::approval::ApprovalRequest;
use tracing::{error, info, warn};

use crate::error::NotificationError;

/// Outbound transport for approval prompts, alerts and status messages.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn send_approval_request(&self, request: &ApprovalRequest) -> Result<(), NotificationError>;

    async fn send_trading_alert(&self, alert: &serde_json::Value) -> Result<(), NotificationError>;

    async fn send_system_status(&self, status: &serde_json::Value) -> Result<(), NotificationError>;
}

/// Per-channel delivery outcome, in registration order.
pub type DeliveryReport = Vec<(String, bool)>;

/// Human-readable approval prompt shared by text channels.
pub fn format_approval_message(request: &ApprovalRequest) -> String {
    let decision = &request.decision;
    let profit = decision
        .estimated_profit
        .map(|p| format!("{p:.3}"))
        .unwrap_or_else(|| "Unknown".to_string());
    let reasoning: String = decision.reasoning.chars().take(500).collect();

    format!(
        "Trading Decision Approval Required\n\
         Strategy: {}\n\
         Action: {} {}\n\
         Amount: {:.3}\n\
         Confidence: {:.1}%\n\
         Risk Level: {}\n\
         Est. Profit: {profit}\n\
         Reasoning: {reasoning}\n\
         Request ID: {}\n\
         Expires: {}",
        decision.strategy_type.to_uppercase(),
        decision.action.as_str().to_uppercase(),
        decision.token_symbol,
        decision.amount,
        decision.confidence_score * 100.0,
        decision.risk_level.as_str().to_uppercase(),
        request.id,
        request.expires_at.to_rfc3339(),
    )
}

/// Fans each notification out to every registered channel.
#[derive(Default, Clone)]
pub struct NotificationManager {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_channel(&mut self, channel: Arc<dyn NotificationChannel>) {
        info!(channel = channel.name(), "Notification channel added");
        self.channels.push(channel);
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub async fn send_approval_request(&self, request: &ApprovalRequest) -> DeliveryReport {
        let mut report = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let outcome = channel.send_approval_request(request).await;
            report.push(record(channel.as_ref(), "approval request", outcome));
        }
        report
    }

    pub async fn send_trading_alert(&self, alert: &serde_json::Value) -> DeliveryReport {
        let mut report = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let outcome = channel.send_trading_alert(alert).await;
            report.push(record(channel.as_ref(), "trading alert", outcome));
        }
        report
    }

    pub async fn send_system_status(&self, status: &serde_json::Value) -> DeliveryReport {
        let mut report = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let outcome = channel.send_system_status(status).await;
            report.push(record(channel.as_ref(), "system status", outcome));
        }
        report
    }
}

fn record(
    channel: &dyn NotificationChannel,
    kind: &str,
    outcome: Result<(), NotificationError>,
) -> (String, bool) {
    match outcome {
        Ok(()) => (channel.name().to_string(), true),
        Err(e) => {
            error!(channel = channel.name(), kind, error = %e, "Notification failed");
            (channel.name().to_string(), false)
        }
    }
}

/// Writes notifications to the tracing log.
#[derive(Debug, Clone)]
pub struct LogChannel {
    name: String,
}

impl Default for LogChannel {
    fn default() -> Self {
        Self {
            name: "log".to_string(),
        }
    }
}

#[async_trait]
impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_approval_request(&self, request: &ApprovalRequest) -> Result<(), NotificationError> {
        warn!(
            request_id = %request.id,
            risk_level = %request.decision.risk_level,
            expires_at = %request.expires_at,
            "{}",
            format_approval_message(request)
        );
        Ok(())
    }

    async fn send_trading_alert(&self, alert: &serde_json::Value) -> Result<(), NotificationError> {
        let kind = alert.get("type").and_then(|t| t.as_str()).unwrap_or("alert");
        info!(alert_type = kind, alert = %alert, "Trading alert");
        Ok(())
    }

    async fn send_system_status(&self, status: &serde_json::Value) -> Result<(), NotificationError> {
        info!(status = %status, "System status");
        Ok(())
    }
}
