//! Repository port for reminder task storage and claiming.

use crate::order::domain::PaymentId;
use crate::reminder::domain::{ReminderTask, ReminderTaskId, ReminderTaskType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for reminder task repository operations.
pub type ReminderTaskRepositoryResult<T> = Result<T, ReminderTaskRepositoryError>;

/// Reminder task persistence contract.
///
/// Tasks are never deleted; finished tasks remain as history.
#[async_trait]
pub trait ReminderTaskRepository: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderTaskRepositoryError::DuplicatePending`] when the
    /// order already has a pending task of the same type.
    async fn insert(&self, task: &ReminderTask) -> ReminderTaskRepositoryResult<()>;

    /// Returns every task for an order, earliest due first.
    async fn find_by_order(
        &self,
        payment_id: &PaymentId,
    ) -> ReminderTaskRepositoryResult<Vec<ReminderTask>>;

    /// Returns up to `limit` pending, unleased tasks due at or before `now`,
    /// earliest due first.
    async fn find_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> ReminderTaskRepositoryResult<Vec<ReminderTask>>;

    /// Leases a task until `lease_expires_at` if it is still pending and
    /// unleased at `now`.
    ///
    /// Returns the claimed task, or `None` when another worker won.
    async fn try_claim(
        &self,
        id: ReminderTaskId,
        now: DateTime<Utc>,
        lease_expires_at: DateTime<Utc>,
    ) -> ReminderTaskRepositoryResult<Option<ReminderTask>>;

    /// Persists the state of a task claimed with `lease_expires_at`.
    ///
    /// The write applies only while the stored task is still pending under
    /// that lease. Returns `false` without writing when the task was
    /// cancelled, finished, or re-claimed in the meantime.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderTaskRepositoryError::NotFound`] when the task does
    /// not exist.
    async fn update_claimed(
        &self,
        task: &ReminderTask,
        lease_expires_at: DateTime<Utc>,
    ) -> ReminderTaskRepositoryResult<bool>;

    /// Cancels every pending task of an order and returns how many changed.
    async fn cancel_pending_for_order(
        &self,
        payment_id: &PaymentId,
        now: DateTime<Utc>,
    ) -> ReminderTaskRepositoryResult<usize>;
}

/// Errors returned by reminder task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ReminderTaskRepositoryError {
    /// The order already has a pending task of this type.
    #[error("order {payment_id} already has a pending {task_type} task")]
    DuplicatePending {
        /// Payment identifier of the order.
        payment_id: PaymentId,
        /// Contested task type.
        task_type: ReminderTaskType,
    },

    /// The task was not found.
    #[error("reminder task not found: {0}")]
    NotFound(ReminderTaskId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ReminderTaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
