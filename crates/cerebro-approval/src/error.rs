use cerebro_models::approval::ApprovalStatus;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("Approval request not found: {0}")]
    NotFound(Uuid),

    #[error("Approval request {id} is already {status}")]
    AlreadyResolved { id: Uuid, status: ApprovalStatus },

    #[error("Approval request {0} expired before it was resolved")]
    Expired(Uuid),

    #[error("Decision {0} already has an approval request")]
    DuplicateDecision(Uuid),
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification transport error: {0}")]
    Transport(String),
}
