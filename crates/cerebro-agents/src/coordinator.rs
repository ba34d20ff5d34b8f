use std::sync::Arc;
use std::time::{Duration, Instant};

use cerebro_models::agent_message::{
    AgentAnalysis, AgentMessage, AgentRole, CollaborativeResult, MessageType, Recommendation,
    Synthesis, VoteWeights,
};
use cerebro_models::config::AgentConfig;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::agent::{analyze_guarded, AnalysisAgent};
use crate::bus::{Mailbox, MessageBus};
use crate::error::BusError;
use crate::roles::builtin_agent;

/// Role under which the coordinator issues analysis requests.
const COORDINATOR_ROLE: AgentRole = AgentRole::StrategyCoordinator;

struct Workers {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

/// Owns a fixed set of analysis roles, runs them as bus workers, and reduces
/// their opinions to one recommendation by confidence-weighted voting.
pub struct MultiAgentCoordinator {
    bus: Arc<MessageBus>,
    agents: Vec<Arc<dyn AnalysisAgent>>,
    timeout: Duration,
    workers: Mutex<Option<Workers>>,
}

impl MultiAgentCoordinator {
    pub fn new(bus: Arc<MessageBus>, agents: Vec<Arc<dyn AnalysisAgent>>, timeout: Duration) -> Self {
        Self {
            bus,
            agents,
            timeout,
            workers: Mutex::new(None),
        }
    }

    /// Coordinator over the built-in roles enabled in `[agent]`.
    pub fn from_config(config: &AgentConfig) -> Self {
        let agents = config
            .roles
            .iter()
            .filter(|r| r.enabled)
            .filter_map(|r| {
                let agent = builtin_agent(r.role);
                if agent.is_none() {
                    warn!(role = %r.role, "Role has no analysis capability, skipping");
                }
                agent
            })
            .collect();

        Self::new(
            Arc::new(MessageBus::new()),
            agents,
            Duration::from_secs(config.collaboration_timeout_seconds),
        )
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn roles(&self) -> Vec<AgentRole> {
        self.agents.iter().map(|a| a.role()).collect()
    }

    pub async fn is_running(&self) -> bool {
        self.workers.lock().await.is_some()
    }

    /// Register every role on the bus and spawn one worker per role.
    /// Calling it again while running is a no-op.
    pub async fn start(&self) -> Result<(), BusError> {
        let mut workers = self.workers.lock().await;
        if workers.is_some() {
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let mut handles = Vec::with_capacity(self.agents.len());
        let mut registered = Vec::with_capacity(self.agents.len());

        for agent in &self.agents {
            let mailbox = match self.bus.register(agent.role()).await {
                Ok(mailbox) => mailbox,
                Err(e) => {
                    cancel.cancel();
                    for role in registered {
                        self.bus.unregister(role).await;
                    }
                    return Err(e);
                }
            };
            registered.push(agent.role());
            handles.push(tokio::spawn(run_worker(
                Arc::clone(agent),
                Arc::clone(&self.bus),
                mailbox,
                cancel.clone(),
            )));
        }

        info!(roles = handles.len(), "Agent workers started");
        *workers = Some(Workers { cancel, handles });
        Ok(())
    }

    /// Cancel all workers and release their bus registrations.
    pub async fn stop(&self) {
        let Some(workers) = self.workers.lock().await.take() else {
            return;
        };

        workers.cancel.cancel();
        for handle in workers.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Agent worker panicked");
            }
        }
        for agent in &self.agents {
            self.bus.unregister(agent.role()).await;
        }
        info!("Agent workers stopped");
    }

    /// Ask every role for an analysis of `data` and synthesize the answers.
    /// Roles that miss the collection timeout are left out of the vote.
    pub async fn collaborative_analysis(&self, data: &serde_json::Value) -> CollaborativeResult {
        let start = Instant::now();
        if let Err(e) = self.start().await {
            warn!(error = %e, "Could not start all agent workers");
        }

        let analyses = self
            .bus
            .request_analysis(COORDINATOR_ROLE, data, &self.roles(), self.timeout)
            .await;
        let synthesis = synthesize(&analyses);

        info!(
            recommendation = %synthesis.recommendation,
            confidence = synthesis.confidence,
            agents = analyses.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Collaborative analysis complete"
        );

        CollaborativeResult {
            individual_analyses: analyses,
            synthesis,
            created_at: Utc::now(),
        }
    }
}

/// Drain `mailbox` until cancelled, answering each analysis request in its own task.
async fn run_worker(
    agent: Arc<dyn AnalysisAgent>,
    bus: Arc<MessageBus>,
    mut mailbox: Mailbox,
    cancel: CancellationToken,
) {
    let role = agent.role();
    debug!(role = %role, "Worker running");

    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            message = mailbox.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        if message.message_type != MessageType::AnalysisRequest {
            debug!(role = %role, message_type = ?message.message_type, "Ignoring message");
            continue;
        }

        let agent = Arc::clone(&agent);
        let bus = Arc::clone(&bus);
        tokio::spawn(async move {
            let started = Instant::now();
            let analysis = analyze_guarded(agent, message.payload).await;
            let payload = match serde_json::to_value(&analysis) {
                Ok(payload) => payload,
                Err(e) => {
                    error!(role = %role, error = %e, "Could not encode analysis");
                    return;
                }
            };
            info!(
                role = %role,
                recommendation = %analysis.recommendation,
                confidence = analysis.confidence,
                elapsed_ms = started.elapsed().as_millis(),
                "Analysis produced"
            );
            bus.send(AgentMessage::new(
                role,
                Some(message.sender_role),
                MessageType::AnalysisResult,
                payload,
                message.correlation_id,
            ))
            .await;
        });
    }

    debug!(role = %role, "Worker stopped");
}

/// Confidence-weighted vote over `{buy, sell, hold}`.
///
/// The strictly heaviest bucket wins, ties fall to hold, and confidence is the
/// winning bucket's share of the total weight.
pub fn synthesize(analyses: &[AgentAnalysis]) -> Synthesis {
    let mut weights = VoteWeights::default();
    for analysis in analyses {
        match Recommendation::from_label(&analysis.recommendation) {
            Recommendation::Buy => weights.buy += analysis.confidence,
            Recommendation::Sell => weights.sell += analysis.confidence,
            Recommendation::Hold => weights.hold += analysis.confidence,
        }
    }

    let total = weights.total();
    if analyses.is_empty() || total <= 0.0 {
        let reasoning = if analyses.is_empty() {
            "No analyses available"
        } else {
            "All analyses have zero confidence"
        };
        return Synthesis {
            recommendation: Recommendation::Hold,
            confidence: 0.0,
            reasoning: reasoning.to_string(),
            agent_count: analyses.len(),
            weights,
        };
    }

    let (recommendation, winning) = if weights.buy > weights.sell && weights.buy > weights.hold {
        (Recommendation::Buy, weights.buy)
    } else if weights.sell > weights.buy && weights.sell > weights.hold {
        (Recommendation::Sell, weights.sell)
    } else {
        (Recommendation::Hold, weights.hold)
    };

    let parts: Vec<String> = analyses
        .iter()
        .map(|a| format!("{}: {} ({:.2})", a.agent_role, a.recommendation, a.confidence))
        .collect();

    Synthesis {
        recommendation,
        confidence: winning / total,
        reasoning: format!("Collaborative analysis: {}", parts.join("; ")),
        agent_count: analyses.len(),
        weights,
    }
}
