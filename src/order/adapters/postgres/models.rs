//! Diesel row models for order persistence.

use super::schema::orders;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for order records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    /// Internal order identifier.
    pub id: uuid::Uuid,
    /// Client idempotency key.
    pub order_reference: String,
    /// Payment provider name.
    pub provider: String,
    /// `PayPal` order id.
    pub paypal_order_id: Option<String>,
    /// Stripe payment intent id.
    pub stripe_payment_intent_id: Option<String>,
    /// Mollie payment id.
    pub mollie_payment_id: Option<String>,
    /// Payment status.
    pub status: String,
    /// Fulfillment status.
    pub fulfillment_status: String,
    /// Cart snapshot JSON.
    pub items: Value,
    /// Order total as a decimal string.
    pub total_amount: String,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Measurements JSON.
    pub measurements: Option<Value>,
    /// Delivery details JSON.
    pub delivery_details: Option<Value>,
    /// Customer JSON.
    pub customer: Value,
    /// Whether funds were captured.
    pub is_paid: bool,
    /// When funds were captured.
    pub paid_at: Option<DateTime<Utc>>,
    /// Payment audit log JSON.
    pub payment_attempts: Value,
    /// Whether the current status was notified.
    pub status_email_sent: bool,
    /// Initial reminder delivery time.
    pub initial_reminder_sent_at: Option<DateTime<Utc>>,
    /// Follow-up reminder delivery time.
    pub followup_reminder_sent_at: Option<DateTime<Utc>>,
    /// Cancellation reason.
    pub cancellation_reason: Option<String>,
    /// Cancellation time.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for order records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    /// Internal order identifier.
    pub id: uuid::Uuid,
    /// Client idempotency key.
    pub order_reference: String,
    /// Payment provider name.
    pub provider: String,
    /// `PayPal` order id.
    pub paypal_order_id: Option<String>,
    /// Stripe payment intent id.
    pub stripe_payment_intent_id: Option<String>,
    /// Mollie payment id.
    pub mollie_payment_id: Option<String>,
    /// Payment status.
    pub status: String,
    /// Fulfillment status.
    pub fulfillment_status: String,
    /// Cart snapshot JSON.
    pub items: Value,
    /// Order total as a decimal string.
    pub total_amount: String,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Measurements JSON.
    pub measurements: Option<Value>,
    /// Delivery details JSON.
    pub delivery_details: Option<Value>,
    /// Customer JSON.
    pub customer: Value,
    /// Whether funds were captured.
    pub is_paid: bool,
    /// When funds were captured.
    pub paid_at: Option<DateTime<Utc>>,
    /// Payment audit log JSON.
    pub payment_attempts: Value,
    /// Whether the current status was notified.
    pub status_email_sent: bool,
    /// Initial reminder delivery time.
    pub initial_reminder_sent_at: Option<DateTime<Utc>>,
    /// Follow-up reminder delivery time.
    pub followup_reminder_sent_at: Option<DateTime<Utc>>,
    /// Cancellation reason.
    pub cancellation_reason: Option<String>,
    /// Cancellation time.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Change set written by status and enrichment updates.
///
/// Identity columns and reminder markers are never rewritten here.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = orders)]
#[diesel(treat_none_as_null = true)]
pub struct OrderChangeset {
    /// Payment status.
    pub status: String,
    /// Fulfillment status.
    pub fulfillment_status: String,
    /// Customer JSON.
    pub customer: Value,
    /// Measurements JSON.
    pub measurements: Option<Value>,
    /// Delivery details JSON.
    pub delivery_details: Option<Value>,
    /// Whether funds were captured.
    pub is_paid: bool,
    /// When funds were captured.
    pub paid_at: Option<DateTime<Utc>>,
    /// Payment audit log JSON.
    pub payment_attempts: Value,
    /// Whether the current status was notified.
    pub status_email_sent: bool,
    /// Cancellation reason.
    pub cancellation_reason: Option<String>,
    /// Cancellation time.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
