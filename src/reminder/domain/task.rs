//! Reminder task entity and its pending/completed/cancelled lifecycle.

use super::ReminderDomainError;
use crate::order::domain::{PaymentId, ReminderKind};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a reminder task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderTaskId(Uuid);

impl ReminderTaskId {
    /// Creates a new random task identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a task identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ReminderTaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReminderTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which reminder a task delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderTaskType {
    /// First nudge shortly after the payer stalls.
    InitialReminder,
    /// Next-day follow-up.
    FollowupReminder,
}

impl ReminderTaskType {
    /// Both task types in delivery order.
    pub const ALL: [Self; 2] = [Self::InitialReminder, Self::FollowupReminder];

    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InitialReminder => "initial_reminder",
            Self::FollowupReminder => "followup_reminder",
        }
    }

    /// Returns the reminder kind this task delivers.
    #[must_use]
    pub const fn kind(self) -> ReminderKind {
        match self {
            Self::InitialReminder => ReminderKind::Initial,
            Self::FollowupReminder => ReminderKind::Followup,
        }
    }
}

impl From<ReminderKind> for ReminderTaskType {
    fn from(kind: ReminderKind) -> Self {
        match kind {
            ReminderKind::Initial => Self::InitialReminder,
            ReminderKind::Followup => Self::FollowupReminder,
        }
    }
}

impl fmt::Display for ReminderTaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ReminderTaskType {
    type Error = super::ParseReminderTaskTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "initial_reminder" => Ok(Self::InitialReminder),
            "followup_reminder" => Ok(Self::FollowupReminder),
            _ => Err(super::ParseReminderTaskTypeError(value.to_owned())),
        }
    }
}

/// Reminder task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderTaskStatus {
    /// Waiting for its scheduled time.
    Pending,
    /// Reminder delivered.
    Completed,
    /// Withdrawn before delivery.
    Cancelled,
}

impl ReminderTaskStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReminderTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ReminderTaskStatus {
    type Error = super::ParseReminderTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(super::ParseReminderTaskStatusError(value.to_owned())),
        }
    }
}

/// A delayed reminder delivery for one order.
///
/// State changes take the caller's `now` so repositories can apply them with
/// the timestamp of the surrounding operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderTask {
    id: ReminderTaskId,
    order_payment_id: PaymentId,
    task_type: ReminderTaskType,
    scheduled_for: DateTime<Utc>,
    status: ReminderTaskStatus,
    executed_at: Option<DateTime<Utc>>,
    error: Option<String>,
    attempts: u32,
    lease_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted reminder task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedReminderTaskData {
    /// Persisted task identifier.
    pub id: ReminderTaskId,
    /// Payment identifier of the reminded order.
    pub order_payment_id: PaymentId,
    /// Persisted task type.
    pub task_type: ReminderTaskType,
    /// Persisted due time.
    pub scheduled_for: DateTime<Utc>,
    /// Persisted status.
    pub status: ReminderTaskStatus,
    /// Persisted completion time.
    pub executed_at: Option<DateTime<Utc>>,
    /// Persisted failure or cancellation message.
    pub error: Option<String>,
    /// Persisted failed execution count.
    pub attempts: u32,
    /// Persisted claim lease expiry.
    pub lease_expires_at: Option<DateTime<Utc>>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ReminderTask {
    /// Creates a pending task due at `scheduled_for`.
    #[must_use]
    pub fn new(
        order_payment_id: PaymentId,
        task_type: ReminderTaskType,
        scheduled_for: DateTime<Utc>,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: ReminderTaskId::new(),
            order_payment_id,
            task_type,
            scheduled_for,
            status: ReminderTaskStatus::Pending,
            executed_at: None,
            error: None,
            attempts: 0,
            lease_expires_at: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedReminderTaskData) -> Self {
        Self {
            id: data.id,
            order_payment_id: data.order_payment_id,
            task_type: data.task_type,
            scheduled_for: data.scheduled_for,
            status: data.status,
            executed_at: data.executed_at,
            error: data.error,
            attempts: data.attempts,
            lease_expires_at: data.lease_expires_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> ReminderTaskId {
        self.id
    }

    /// Returns the payment identifier of the reminded order.
    #[must_use]
    pub const fn order_payment_id(&self) -> &PaymentId {
        &self.order_payment_id
    }

    /// Returns the task type.
    #[must_use]
    pub const fn task_type(&self) -> ReminderTaskType {
        self.task_type
    }

    /// Returns the due time.
    #[must_use]
    pub const fn scheduled_for(&self) -> DateTime<Utc> {
        self.scheduled_for
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> ReminderTaskStatus {
        self.status
    }

    /// Returns when the reminder was delivered.
    #[must_use]
    pub const fn executed_at(&self) -> Option<DateTime<Utc>> {
        self.executed_at
    }

    /// Returns the last failure or the cancellation reason.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns how many executions failed so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns when the current claim lease expires.
    #[must_use]
    pub const fn lease_expires_at(&self) -> Option<DateTime<Utc>> {
        self.lease_expires_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether the task is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == ReminderTaskStatus::Pending
    }

    /// Returns whether another worker holds an unexpired lease at `now`.
    #[must_use]
    pub fn is_leased(&self, now: DateTime<Utc>) -> bool {
        self.lease_expires_at.is_some_and(|expiry| expiry > now)
    }

    /// Returns whether the task may be claimed at `now`.
    #[must_use]
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.scheduled_for <= now && !self.is_leased(now)
    }

    /// Takes a claim lease until `lease_expires_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderDomainError::TaskNotPending`] for finished tasks.
    pub fn claim(
        &mut self,
        lease_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), ReminderDomainError> {
        self.ensure_pending()?;
        self.lease_expires_at = Some(lease_expires_at);
        self.updated_at = now;
        Ok(())
    }

    /// Marks the reminder as delivered.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderDomainError::TaskNotPending`] for finished tasks.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), ReminderDomainError> {
        self.ensure_pending()?;
        self.status = ReminderTaskStatus::Completed;
        self.executed_at = Some(now);
        self.lease_expires_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Withdraws the task, recording `reason` when given.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderDomainError::TaskNotPending`] for finished tasks.
    pub fn cancel(
        &mut self,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ReminderDomainError> {
        self.ensure_pending()?;
        self.status = ReminderTaskStatus::Cancelled;
        if reason.is_some() {
            self.error = reason;
        }
        self.lease_expires_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Records a failed delivery; the task stays pending and unleased.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderDomainError::TaskNotPending`] for finished tasks.
    pub fn record_failure(
        &mut self,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ReminderDomainError> {
        self.ensure_pending()?;
        self.error = Some(error.into());
        self.attempts = self.attempts.saturating_add(1);
        self.lease_expires_at = None;
        self.updated_at = now;
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), ReminderDomainError> {
        if self.is_pending() {
            return Ok(());
        }
        Err(ReminderDomainError::TaskNotPending {
            task_id: self.id,
            status: self.status,
        })
    }
}
