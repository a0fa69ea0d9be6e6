//! Outbound customer notification port.

use crate::order::domain::{Order, OrderStatus, ReminderKind};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for notification delivery.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Delivers customer-facing messages about an order.
///
/// Rendering and transport are owned by the implementation; callers only
/// describe which message is due.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Tells the customer that the order moved away from `previous_status`.
    async fn send_status_notification(
        &self,
        order: &Order,
        previous_status: OrderStatus,
    ) -> NotificationResult<()>;

    /// Reminds the customer to finish paying for the order.
    async fn send_reminder_notification(
        &self,
        order: &Order,
        order_url: &str,
        kind: ReminderKind,
    ) -> NotificationResult<()>;
}

/// Errors returned by notification gateways.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    /// The order has no contact address to deliver to.
    #[error("no recipient for order {0}")]
    MissingRecipient(String),

    /// The delivery service rejected the message.
    #[error("notification rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status returned by the delivery service.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Transport failure.
    #[error("notification transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl NotificationError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
