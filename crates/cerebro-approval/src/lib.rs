pub mod error;
pub mod manager;
pub mod notification;
pub mod risk;

pub mod test_support;

pub use error::{ApprovalError, NotificationError};
pub use manager::ApprovalManager;
pub use notification::{LogChannel, NotificationChannel, NotificationManager};
pub use risk::{assess_trading_risk, calculate_confidence_score};
