//! Diesel row models for reminder task persistence.

use super::schema::reminder_tasks;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for reminder tasks.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = reminder_tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReminderTaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Payment identifier of the reminded order.
    pub order_payment_id: String,
    /// Task type.
    pub task_type: String,
    /// Due time.
    pub scheduled_for: DateTime<Utc>,
    /// Task status.
    pub status: String,
    /// Delivery time.
    pub executed_at: Option<DateTime<Utc>>,
    /// Last failure or cancellation reason.
    pub error: Option<String>,
    /// Failed execution count.
    pub attempts: i32,
    /// Claim lease expiry.
    pub lease_expires_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert and full-update model for reminder tasks.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = reminder_tasks)]
#[diesel(treat_none_as_null = true)]
pub struct NewReminderTaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Payment identifier of the reminded order.
    pub order_payment_id: String,
    /// Task type.
    pub task_type: String,
    /// Due time.
    pub scheduled_for: DateTime<Utc>,
    /// Task status.
    pub status: String,
    /// Delivery time.
    pub executed_at: Option<DateTime<Utc>>,
    /// Last failure or cancellation reason.
    pub error: Option<String>,
    /// Failed execution count.
    pub attempts: i32,
    /// Claim lease expiry.
    pub lease_expires_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
