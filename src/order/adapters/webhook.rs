//! Notification delivery through a mail-service webhook.
//!
//! The mail service owns templates and rendering. This adapter posts a JSON
//! description of the message with a shared key header.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::WebhookConfig;
use crate::order::{
    domain::{Order, OrderStatus, ReminderKind},
    ports::{NotificationError, NotificationGateway, NotificationResult},
};

/// Header carrying the shared webhook key.
pub const WEBHOOK_KEY_HEADER: &str = "X-Atelier-Webhook-Key";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body posted to the mail service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// The order moved to a new status.
    StatusChange {
        /// Recipient address.
        to: String,
        /// Recipient display name, if known.
        name: Option<String>,
        /// Client order reference.
        order_reference: String,
        /// Provider payment identifier.
        payment_id: String,
        /// Status before the change.
        previous_status: OrderStatus,
        /// Status after the change.
        status: OrderStatus,
        /// Order total in major units.
        total_amount: String,
        /// ISO 4217 currency code.
        currency: String,
    },
    /// The payer has not finished paying.
    Reminder {
        /// Recipient address.
        to: String,
        /// Recipient display name, if known.
        name: Option<String>,
        /// Client order reference.
        order_reference: String,
        /// Provider payment identifier.
        payment_id: String,
        /// `initial` or `followup`.
        reminder: ReminderKind,
        /// Link back to the order.
        order_url: String,
        /// Order total in major units.
        total_amount: String,
        /// ISO 4217 currency code.
        currency: String,
    },
}

impl NotificationPayload {
    /// Describes a status-change message for `order`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::MissingRecipient`] when neither the
    /// customer nor the delivery details carry an email address.
    pub fn status_change(order: &Order, previous_status: OrderStatus) -> NotificationResult<Self> {
        Ok(Self::StatusChange {
            to: recipient(order)?,
            name: order.customer().name().map(str::to_owned),
            order_reference: order.order_reference().to_string(),
            payment_id: order.payment_id().to_string(),
            previous_status,
            status: order.status(),
            total_amount: order.total_amount().to_string(),
            currency: order.currency().to_owned(),
        })
    }

    /// Describes a reminder message for `order`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::MissingRecipient`] when neither the
    /// customer nor the delivery details carry an email address.
    pub fn reminder(order: &Order, order_url: &str, kind: ReminderKind) -> NotificationResult<Self> {
        Ok(Self::Reminder {
            to: recipient(order)?,
            name: order.customer().name().map(str::to_owned),
            order_reference: order.order_reference().to_string(),
            payment_id: order.payment_id().to_string(),
            reminder: kind,
            order_url: order_url.to_owned(),
            total_amount: order.total_amount().to_string(),
            currency: order.currency().to_owned(),
        })
    }
}

fn recipient(order: &Order) -> NotificationResult<String> {
    order
        .customer()
        .email()
        .or_else(|| order.delivery_details().and_then(|details| details.email()))
        .map(str::to_owned)
        .ok_or_else(|| NotificationError::MissingRecipient(order.payment_id().to_string()))
}

/// Gateway posting notifications to a mail-service webhook.
#[derive(Clone)]
pub struct WebhookNotificationGateway {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookNotificationGateway {
    /// Creates a webhook gateway.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Transport`] if the HTTP client fails to
    /// build.
    pub fn new(config: WebhookConfig) -> NotificationResult<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(NotificationError::transport)?;
        Ok(Self { client, config })
    }

    async fn post(&self, payload: &NotificationPayload) -> NotificationResult<()> {
        let response = self
            .client
            .post(&self.config.url)
            .header(WEBHOOK_KEY_HEADER, self.config.api_key.expose_secret())
            .json(payload)
            .send()
            .await
            .map_err(NotificationError::transport)?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        debug!(status = status.as_u16(), "notification webhook accepted payload");
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for WebhookNotificationGateway {
    async fn send_status_notification(
        &self,
        order: &Order,
        previous_status: OrderStatus,
    ) -> NotificationResult<()> {
        let payload = NotificationPayload::status_change(order, previous_status)?;
        self.post(&payload).await
    }

    async fn send_reminder_notification(
        &self,
        order: &Order,
        order_url: &str,
        kind: ReminderKind,
    ) -> NotificationResult<()> {
        let payload = NotificationPayload::reminder(order, order_url, kind)?;
        self.post(&payload).await
    }
}

impl std::fmt::Debug for WebhookNotificationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotificationGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
