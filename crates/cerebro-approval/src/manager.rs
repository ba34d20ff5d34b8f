use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use cerebro_models::approval::{ApprovalRequest, ApprovalStats, ApprovalStatus};
use cerebro_models::config::ApprovalConfig;
use cerebro_models::trade_decision::TradingDecision;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApprovalError;
use crate::notification::{NotificationChannel, NotificationManager};

/// Approver recorded on auto-approved requests.
const SYSTEM_APPROVER: &str = "system";

/// A threshold of 1.0 or more disables auto-approval for its tier outright,
/// so even a fully confident decision waits for a person.
fn auto_approves(threshold: f64, confidence: f64) -> bool {
    threshold < 1.0 && confidence >= threshold
}

#[derive(Default)]
struct ApprovalState {
    pending: HashMap<Uuid, ApprovalRequest>,
    history: Vec<ApprovalRequest>,
    decisions: HashSet<Uuid>,
}

impl ApprovalState {
    fn status_of(&self, id: Uuid) -> Option<ApprovalStatus> {
        self.history
            .iter()
            .rev()
            .find(|r| r.id == id)
            .map(|r| r.status)
    }

    fn closed_error(&self, id: Uuid) -> ApprovalError {
        match self.status_of(id) {
            Some(status) => ApprovalError::AlreadyResolved { id, status },
            None => ApprovalError::NotFound(id),
        }
    }

    /// Move `request` into history as `Timeout`.
    fn expire(&mut self, mut request: ApprovalRequest) {
        request.status = ApprovalStatus::Timeout;
        warn!(request_id = %request.id, "Approval request timed out");
        self.history.push(request);
    }

    /// Remove a pending request that may still be resolved at `now`.
    /// A request found past its expiry is finalized as `Timeout` instead.
    fn take_open(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<ApprovalRequest, ApprovalError> {
        let Some(request) = self.pending.remove(&id) else {
            return Err(self.closed_error(id));
        };
        if request.is_expired_at(now) {
            self.expire(request);
            return Err(ApprovalError::Expired(id));
        }
        Ok(request)
    }
}

/// Risk-tiered approval gate for trading decisions.
///
/// A decision whose confidence meets its tier's threshold is approved on the
/// spot; anything else waits as `Pending` until a person approves or rejects
/// it, or until it expires. Every status except `Pending` is final and lives
/// in the append-only history.
pub struct ApprovalManager {
    config: ApprovalConfig,
    state: Mutex<ApprovalState>,
    notifications: RwLock<NotificationManager>,
    resolved: Notify,
}

impl Default for ApprovalManager {
    fn default() -> Self {
        Self::new(ApprovalConfig::default())
    }
}

impl ApprovalManager {
    pub fn new(config: ApprovalConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ApprovalState::default()),
            notifications: RwLock::new(NotificationManager::new()),
            resolved: Notify::new(),
        }
    }

    pub fn config(&self) -> &ApprovalConfig {
        &self.config
    }

    pub async fn add_notification_channel(&self, channel: Arc<dyn NotificationChannel>) {
        self.notifications.write().await.add_channel(channel);
    }

    pub async fn notifications(&self) -> NotificationManager {
        self.notifications.read().await.clone()
    }

    /// Open an approval request for `decision`.
    ///
    /// The returned request is already `AutoApproved` when the decision's
    /// confidence reaches its tier's threshold. Otherwise it is `Pending` and
    /// every notification channel has been told about it.
    pub async fn request_approval(
        &self,
        decision: TradingDecision,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let now = Utc::now();
        let level = decision.risk_level;
        let timeout = chrono::Duration::seconds(self.config.timeouts_seconds.get(level) as i64);
        let threshold = self.config.auto_approval_thresholds.get(level);

        let mut request = ApprovalRequest {
            id: Uuid::new_v4(),
            status: ApprovalStatus::Pending,
            created_at: now,
            expires_at: now + timeout,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            notification_sent: false,
            decision,
        };

        {
            let mut state = self.state.lock().await;
            if !state.decisions.insert(request.decision.id) {
                return Err(ApprovalError::DuplicateDecision(request.decision.id));
            }

            if auto_approves(threshold, request.decision.confidence_score) {
                request.status = ApprovalStatus::AutoApproved;
                request.approved_by = Some(SYSTEM_APPROVER.to_string());
                request.approved_at = Some(now);
                state.history.push(request.clone());
                info!(
                    request_id = %request.id,
                    decision_id = %request.decision.id,
                    confidence = request.decision.confidence_score,
                    risk_level = %level,
                    "Decision auto-approved"
                );
                return Ok(request);
            }

            state.pending.insert(request.id, request.clone());
        }

        info!(
            request_id = %request.id,
            decision_id = %request.decision.id,
            risk_level = %level,
            expires_at = %request.expires_at,
            "Approval requested"
        );

        let report = self
            .notifications
            .read()
            .await
            .send_approval_request(&request)
            .await;
        let delivered = report.iter().all(|(_, ok)| *ok);
        if !delivered {
            warn!(request_id = %request.id, "Some approval notifications failed");
        }

        request.notification_sent = delivered;
        if let Some(stored) = self.state.lock().await.pending.get_mut(&request.id) {
            stored.notification_sent = delivered;
        }
        Ok(request)
    }

    pub async fn approve_request(
        &self,
        id: Uuid,
        approved_by: &str,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let now = Utc::now();
        let result = {
            let mut state = self.state.lock().await;
            state.take_open(id, now).map(|mut request| {
                request.status = ApprovalStatus::Approved;
                request.approved_by = Some(approved_by.to_string());
                request.approved_at = Some(now);
                state.history.push(request.clone());
                request
            })
        };
        self.resolved.notify_waiters();

        match &result {
            Ok(_) => info!(request_id = %id, approved_by, "Request approved"),
            Err(e) => warn!(request_id = %id, error = %e, "Approve rejected"),
        }
        result
    }

    pub async fn reject_request(
        &self,
        id: Uuid,
        rejected_by: &str,
        reason: &str,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let now = Utc::now();
        let result = {
            let mut state = self.state.lock().await;
            state.take_open(id, now).map(|mut request| {
                request.status = ApprovalStatus::Rejected;
                request.approved_by = Some(rejected_by.to_string());
                request.approved_at = Some(now);
                request.rejection_reason = Some(reason.to_string());
                state.history.push(request.clone());
                request
            })
        };
        self.resolved.notify_waiters();

        match &result {
            Ok(_) => info!(request_id = %id, rejected_by, reason, "Request rejected"),
            Err(e) => warn!(request_id = %id, error = %e, "Reject refused"),
        }
        result
    }

    /// Block until request `id` leaves `Pending` or `timeout` elapses.
    ///
    /// Without a timeout the wait lasts until the request's own expiry (at
    /// least one second). A request still pending when the wait ends is
    /// finalized as `Timeout`.
    pub async fn wait_for_approval(
        &self,
        id: Uuid,
        timeout: Option<Duration>,
    ) -> Result<ApprovalStatus, ApprovalError> {
        let wait = {
            let state = self.state.lock().await;
            match state.pending.get(&id) {
                Some(request) => timeout.unwrap_or_else(|| {
                    let remaining = (request.expires_at - Utc::now()).to_std().unwrap_or_default();
                    remaining.max(Duration::from_secs(1))
                }),
                None => return state.status_of(id).ok_or(ApprovalError::NotFound(id)),
            }
        };

        let deadline = Instant::now() + wait;
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));

        loop {
            let notified = self.resolved.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.state.lock().await;
                if !state.pending.contains_key(&id) {
                    return state.status_of(id).ok_or(ApprovalError::NotFound(id));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let _ = tokio::time::timeout(poll.min(deadline - now), notified).await;
        }

        let status = {
            let mut state = self.state.lock().await;
            match state.pending.remove(&id) {
                Some(request) => {
                    state.expire(request);
                    ApprovalStatus::Timeout
                }
                None => state.status_of(id).unwrap_or(ApprovalStatus::Timeout),
            }
        };
        self.resolved.notify_waiters();
        Ok(status)
    }

    /// Finalize every pending request past its expiry as `Timeout`.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let expired = {
            let mut state = self.state.lock().await;
            let ids: Vec<Uuid> = state
                .pending
                .values()
                .filter(|r| r.is_expired_at(now))
                .map(|r| r.id)
                .collect();
            for id in &ids {
                if let Some(request) = state.pending.remove(id) {
                    state.expire(request);
                }
            }
            ids.len()
        };

        if expired > 0 {
            self.resolved.notify_waiters();
            info!(expired, "Expired approval requests swept");
        } else {
            debug!("No expired approval requests");
        }
        expired
    }

    /// Run `sweep_expired` every `interval` until `cancel` fires.
    pub fn spawn_expiry_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Approval expiry sweeper shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        manager.sweep_expired().await;
                    }
                }
            }
        })
    }

    pub async fn get_request(&self, id: Uuid) -> Option<ApprovalRequest> {
        let state = self.state.lock().await;
        state
            .pending
            .get(&id)
            .cloned()
            .or_else(|| state.history.iter().rev().find(|r| r.id == id).cloned())
    }

    /// Pending requests, oldest first.
    pub async fn get_pending_requests(&self) -> Vec<ApprovalRequest> {
        let mut pending: Vec<ApprovalRequest> =
            self.state.lock().await.pending.values().cloned().collect();
        pending.sort_by_key(|r| r.created_at);
        pending
    }

    /// The most recent `limit` finalized requests, oldest first.
    pub async fn get_approval_history(&self, limit: usize) -> Vec<ApprovalRequest> {
        let state = self.state.lock().await;
        let start = state.history.len().saturating_sub(limit);
        state.history[start..].to_vec()
    }

    pub async fn get_approval_stats(&self) -> ApprovalStats {
        let state = self.state.lock().await;
        let count = |status: ApprovalStatus| state.history.iter().filter(|r| r.status == status).count();

        let total = state.history.len();
        let approved = count(ApprovalStatus::Approved);
        let auto_approved = count(ApprovalStatus::AutoApproved);
        let rate = |n: usize| if total == 0 { 0.0 } else { n as f64 / total as f64 };

        ApprovalStats {
            total_requests: total,
            approved,
            auto_approved,
            rejected: count(ApprovalStatus::Rejected),
            timeout: count(ApprovalStatus::Timeout),
            approval_rate: rate(approved + auto_approved),
            auto_approval_rate: rate(auto_approved),
            pending: state.pending.len(),
        }
    }
}
