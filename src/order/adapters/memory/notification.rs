//! Notification gateway that records deliveries instead of sending them.

use async_trait::async_trait;
use std::sync::{
    Arc, RwLock,
    atomic::{AtomicBool, Ordering},
};

use crate::order::{
    domain::{Order, OrderStatus, PaymentId, ReminderKind},
    ports::{NotificationError, NotificationGateway, NotificationResult},
};

/// A notification captured by [`RecordingNotificationGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentNotification {
    /// A status-change message.
    Status {
        /// Payment identifier of the order.
        payment_id: PaymentId,
        /// Status before the change.
        previous: OrderStatus,
        /// Status after the change.
        current: OrderStatus,
    },
    /// An abandoned-checkout reminder.
    Reminder {
        /// Payment identifier of the order.
        payment_id: PaymentId,
        /// Link included in the reminder.
        order_url: String,
        /// Which reminder was sent.
        kind: ReminderKind,
    },
}

impl SentNotification {
    /// Returns the payment identifier the notification was about.
    #[must_use]
    pub const fn payment_id(&self) -> &PaymentId {
        match self {
            Self::Status { payment_id, .. } | Self::Reminder { payment_id, .. } => payment_id,
        }
    }
}

/// Thread-safe gateway that keeps every delivered notification in memory.
///
/// Delivery can be switched to fail so callers' error isolation and retry
/// paths can be exercised.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotificationGateway {
    sent: Arc<RwLock<Vec<SentNotification>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotificationGateway {
    /// Creates a gateway that accepts every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent deliveries fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns every notification delivered so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .read()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Returns the reminders delivered for a payment, oldest first.
    #[must_use]
    pub fn reminders_for(&self, payment_id: &PaymentId) -> Vec<ReminderKind> {
        self.sent()
            .into_iter()
            .filter_map(|notification| match notification {
                SentNotification::Reminder {
                    payment_id: sent_for,
                    kind,
                    ..
                } if &sent_for == payment_id => Some(kind),
                _ => None,
            })
            .collect()
    }

    /// Returns the status messages delivered for a payment, oldest first.
    #[must_use]
    pub fn status_notifications_for(&self, payment_id: &PaymentId) -> Vec<OrderStatus> {
        self.sent()
            .into_iter()
            .filter_map(|notification| match notification {
                SentNotification::Status {
                    payment_id: sent_for,
                    current,
                    ..
                } if &sent_for == payment_id => Some(current),
                _ => None,
            })
            .collect()
    }

    fn record(&self, notification: SentNotification) -> NotificationResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Rejected {
                status: 503,
                message: "delivery disabled".to_owned(),
            });
        }
        let mut sent = self
            .sent
            .write()
            .map_err(|err| NotificationError::transport(std::io::Error::other(err.to_string())))?;
        sent.push(notification);
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for RecordingNotificationGateway {
    async fn send_status_notification(
        &self,
        order: &Order,
        previous_status: OrderStatus,
    ) -> NotificationResult<()> {
        self.record(SentNotification::Status {
            payment_id: order.payment_id().clone(),
            previous: previous_status,
            current: order.status(),
        })
    }

    async fn send_reminder_notification(
        &self,
        order: &Order,
        order_url: &str,
        kind: ReminderKind,
    ) -> NotificationResult<()> {
        self.record(SentNotification::Reminder {
            payment_id: order.payment_id().clone(),
            order_url: order_url.to_owned(),
            kind,
        })
    }
}
