use std::collections::{HashMap, HashSet};
use std::time::Duration;

use cerebro_models::agent_message::{AgentAnalysis, AgentMessage, AgentRole, MessageType};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::BusError;

/// Inbound queue handed to a role when it registers.
pub type Mailbox = mpsc::UnboundedReceiver<AgentMessage>;

struct BusState {
    mailboxes: HashMap<AgentRole, mpsc::UnboundedSender<AgentMessage>>,
    history: Vec<AgentMessage>,
}

/// In-memory point-to-point and broadcast delivery between registered roles.
///
/// Every sent message is appended to a history log under the same lock that
/// delivers it, so history order is send order. Waiters on correlated
/// responses are woken through a `Notify` rather than by polling.
pub struct MessageBus {
    state: Mutex<BusState>,
    delivered: Notify,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BusState {
                mailboxes: HashMap::new(),
                history: Vec::new(),
            }),
            delivered: Notify::new(),
        }
    }

    /// Bind `role` to a fresh inbound queue.
    pub async fn register(&self, role: AgentRole) -> Result<Mailbox, BusError> {
        let mut state = self.state.lock().await;
        if state.mailboxes.contains_key(&role) {
            return Err(BusError::AlreadyRegistered(role));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.mailboxes.insert(role, tx);
        info!(role = %role, "Role registered on bus");
        Ok(rx)
    }

    pub async fn unregister(&self, role: AgentRole) -> bool {
        self.state.lock().await.mailboxes.remove(&role).is_some()
    }

    pub async fn registered_roles(&self) -> Vec<AgentRole> {
        let mut roles: Vec<AgentRole> = self.state.lock().await.mailboxes.keys().copied().collect();
        roles.sort();
        roles
    }

    /// Record `message` and deliver it. Unknown recipients are logged, not raised.
    pub async fn send(&self, message: AgentMessage) {
        {
            let mut state = self.state.lock().await;
            state.history.push(message.clone());

            match message.recipient_role {
                Some(recipient) => match state.mailboxes.get(&recipient) {
                    Some(tx) => {
                        if tx.send(message).is_err() {
                            debug!(recipient = %recipient, "Recipient mailbox closed");
                        }
                    }
                    None => {
                        debug!(recipient = %recipient, "No role registered for recipient, dropping");
                    }
                },
                None => {
                    for (role, tx) in &state.mailboxes {
                        if *role == message.sender_role {
                            continue;
                        }
                        if tx.send(message.clone()).is_err() {
                            debug!(recipient = %role, "Recipient mailbox closed");
                        }
                    }
                }
            }
        }
        self.delivered.notify_waiters();
    }

    pub async fn history(&self) -> Vec<AgentMessage> {
        self.state.lock().await.history.clone()
    }

    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }

    /// Send one `AnalysisRequest` per target under a fresh correlation id and
    /// collect the first `AnalysisResult` from each target.
    ///
    /// Returns early once every target has answered; on timeout returns
    /// whatever arrived. Results come back in target order.
    pub async fn request_analysis(
        &self,
        requester: AgentRole,
        data: &serde_json::Value,
        targets: &[AgentRole],
        timeout: Duration,
    ) -> Vec<AgentAnalysis> {
        let mut unique: Vec<AgentRole> = Vec::with_capacity(targets.len());
        for role in targets {
            if !unique.contains(role) {
                unique.push(*role);
            }
        }
        if unique.is_empty() {
            return Vec::new();
        }

        let correlation_id = Uuid::new_v4();
        let deadline = Instant::now() + timeout;

        // Results are only looked for after this point in the history.
        let mut cursor = self.history_len().await;

        for target in &unique {
            self.send(AgentMessage::new(
                requester,
                Some(*target),
                MessageType::AnalysisRequest,
                data.clone(),
                Some(correlation_id),
            ))
            .await;
        }

        let wanted: HashSet<AgentRole> = unique.iter().copied().collect();
        let mut collected: HashMap<AgentRole, AgentAnalysis> = HashMap::new();

        loop {
            let notified = self.delivered.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.state.lock().await;
                for message in &state.history[cursor..] {
                    if message.correlation_id != Some(correlation_id)
                        || message.message_type != MessageType::AnalysisResult
                        || !wanted.contains(&message.sender_role)
                        || collected.contains_key(&message.sender_role)
                    {
                        continue;
                    }
                    match serde_json::from_value::<AgentAnalysis>(message.payload.clone()) {
                        Ok(analysis) => {
                            collected.insert(message.sender_role, analysis);
                        }
                        Err(e) => {
                            warn!(sender = %message.sender_role, error = %e, "Malformed analysis result");
                        }
                    }
                }
                cursor = state.history.len();
            }

            if collected.len() == wanted.len() {
                break;
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let missing: Vec<String> = unique
                    .iter()
                    .filter(|r| !collected.contains_key(r))
                    .map(|r| r.to_string())
                    .collect();
                warn!(
                    %correlation_id,
                    received = collected.len(),
                    missing = ?missing,
                    "Analysis collection timed out, returning partial results"
                );
                break;
            }
        }

        unique
            .iter()
            .filter_map(|role| collected.remove(role))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn analysis(role: AgentRole, recommendation: &str, confidence: f64) -> AgentAnalysis {
        AgentAnalysis {
            agent_role: role,
            analysis_type: "test".to_string(),
            confidence,
            recommendation: recommendation.to_string(),
            data: serde_json::json!({}),
            reasoning: String::new(),
            created_at: chrono::Utc::now(),
        }
    }

    /// Answer every analysis request arriving in `mailbox` with a fixed analysis.
    fn spawn_responder(bus: Arc<MessageBus>, mut mailbox: Mailbox, role: AgentRole) {
        tokio::spawn(async move {
            while let Some(msg) = mailbox.recv().await {
                if msg.message_type != MessageType::AnalysisRequest {
                    continue;
                }
                let payload = serde_json::to_value(analysis(role, "BUY", 0.7)).unwrap();
                bus.send(AgentMessage::new(
                    role,
                    Some(msg.sender_role),
                    MessageType::AnalysisResult,
                    payload,
                    msg.correlation_id,
                ))
                .await;
            }
        });
    }

    #[tokio::test]
    async fn duplicate_registration_fails() {
        let bus = MessageBus::new();
        let _mailbox = bus.register(AgentRole::RiskAssessor).await.unwrap();
        let err = bus.register(AgentRole::RiskAssessor).await.unwrap_err();
        assert_eq!(err, BusError::AlreadyRegistered(AgentRole::RiskAssessor));
    }

    #[tokio::test]
    async fn point_to_point_delivers_to_recipient_only() {
        let bus = MessageBus::new();
        let mut technical = bus.register(AgentRole::TechnicalAnalyst).await.unwrap();
        let mut risk = bus.register(AgentRole::RiskAssessor).await.unwrap();

        bus.send(AgentMessage::new(
            AgentRole::StrategyCoordinator,
            Some(AgentRole::TechnicalAnalyst),
            MessageType::StatusUpdate,
            serde_json::json!({"status": "ok"}),
            None,
        ))
        .await;

        assert!(technical.try_recv().is_ok());
        assert!(risk.try_recv().is_err());
        assert_eq!(bus.history_len().await, 1);
    }

    #[tokio::test]
    async fn unknown_recipient_is_recorded_not_raised() {
        let bus = MessageBus::new();
        bus.send(AgentMessage::new(
            AgentRole::StrategyCoordinator,
            Some(AgentRole::ActionExecutor),
            MessageType::ActionProposal,
            serde_json::json!({}),
            None,
        ))
        .await;
        assert_eq!(bus.history_len().await, 1);
    }

    #[tokio::test]
    async fn broadcast_skips_sender() {
        let bus = MessageBus::new();
        let mut sentiment = bus.register(AgentRole::SentimentAnalyzer).await.unwrap();
        let mut technical = bus.register(AgentRole::TechnicalAnalyst).await.unwrap();
        let mut risk = bus.register(AgentRole::RiskAssessor).await.unwrap();

        bus.send(AgentMessage::new(
            AgentRole::SentimentAnalyzer,
            None,
            MessageType::StatusUpdate,
            serde_json::json!({"status": "ready"}),
            None,
        ))
        .await;

        assert!(sentiment.try_recv().is_err());
        assert!(technical.try_recv().is_ok());
        assert!(technical.try_recv().is_err());
        assert!(risk.try_recv().is_ok());
        assert!(risk.try_recv().is_err());
    }

    #[tokio::test]
    async fn request_analysis_collects_all_targets() {
        let bus = Arc::new(MessageBus::new());
        for role in [AgentRole::TechnicalAnalyst, AgentRole::RiskAssessor] {
            let mailbox = bus.register(role).await.unwrap();
            spawn_responder(bus.clone(), mailbox, role);
        }

        let results = bus
            .request_analysis(
                AgentRole::StrategyCoordinator,
                &serde_json::json!({"query": "x"}),
                &[AgentRole::TechnicalAnalyst, AgentRole::RiskAssessor],
                Duration::from_secs(5),
            )
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].agent_role, AgentRole::TechnicalAnalyst);
        assert_eq!(results[1].agent_role, AgentRole::RiskAssessor);
        // Two requests plus two results.
        assert_eq!(bus.history_len().await, 4);
    }

    #[tokio::test]
    async fn request_analysis_returns_partial_on_timeout() {
        let bus = Arc::new(MessageBus::new());
        let mailbox = bus.register(AgentRole::TechnicalAnalyst).await.unwrap();
        spawn_responder(bus.clone(), mailbox, AgentRole::TechnicalAnalyst);
        // Registered but never answers.
        let _silent = bus.register(AgentRole::RiskAssessor).await.unwrap();

        let started = std::time::Instant::now();
        let results = bus
            .request_analysis(
                AgentRole::StrategyCoordinator,
                &serde_json::json!({}),
                &[AgentRole::TechnicalAnalyst, AgentRole::RiskAssessor],
                Duration::from_millis(200),
            )
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].agent_role, AgentRole::TechnicalAnalyst);
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn stale_correlation_ids_are_ignored() {
        let bus = Arc::new(MessageBus::new());
        let _mailbox = bus.register(AgentRole::RiskAssessor).await.unwrap();

        // A result for some earlier request is already in history.
        bus.send(AgentMessage::new(
            AgentRole::RiskAssessor,
            Some(AgentRole::StrategyCoordinator),
            MessageType::AnalysisResult,
            serde_json::to_value(analysis(AgentRole::RiskAssessor, "SELL", 0.9)).unwrap(),
            Some(Uuid::new_v4()),
        ))
        .await;

        let results = bus
            .request_analysis(
                AgentRole::StrategyCoordinator,
                &serde_json::json!({}),
                &[AgentRole::RiskAssessor],
                Duration::from_millis(100),
            )
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn no_targets_returns_immediately() {
        let bus = MessageBus::new();
        let results = bus
            .request_analysis(
                AgentRole::StrategyCoordinator,
                &serde_json::json!({}),
                &[],
                Duration::from_secs(30),
            )
            .await;
        assert!(results.is_empty());
        assert_eq!(bus.history_len().await, 0);
    }
}
