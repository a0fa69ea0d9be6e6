//! Repository port for durable order storage and lookup.

use crate::order::domain::{Order, OrderReference, OrderStatus, PaymentId, ReminderKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for order repository operations.
pub type OrderRepositoryResult<T> = Result<T, OrderRepositoryError>;

/// Durable order persistence contract.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores a new order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderRepositoryError::DuplicatePaymentId`] when an order for
    /// the provider payment already exists or
    /// [`OrderRepositoryError::DuplicateReference`] when the order reference
    /// is taken.
    async fn store(&self, order: &Order) -> OrderRepositoryResult<()>;

    /// Persists changes to an existing order when its stored status still
    /// equals `expected_status`.
    ///
    /// Reminder markers already stored are kept; they are written only
    /// through [`OrderRepository::record_reminder_sent`].
    ///
    /// # Errors
    ///
    /// Returns [`OrderRepositoryError::NotFound`] when the order does not
    /// exist and [`OrderRepositoryError::StatusConflict`] when another writer
    /// changed the status first.
    async fn update(
        &self,
        order: &Order,
        expected_status: OrderStatus,
    ) -> OrderRepositoryResult<()>;

    /// Finds an order by provider payment identifier.
    async fn find_by_payment_id(
        &self,
        payment_id: &PaymentId,
    ) -> OrderRepositoryResult<Option<Order>>;

    /// Finds an order by client order reference.
    async fn find_by_reference(
        &self,
        order_reference: &OrderReference,
    ) -> OrderRepositoryResult<Option<Order>>;

    /// Returns orders still awaiting the payer whose follow-up reminder was
    /// delivered before `cutoff`, oldest reminder first.
    async fn find_abandoned(&self, cutoff: DateTime<Utc>) -> OrderRepositoryResult<Vec<Order>>;

    /// Records delivery of a reminder unless one is already recorded.
    ///
    /// Returns `true` when the marker was newly set.
    ///
    /// # Errors
    ///
    /// Returns [`OrderRepositoryError::NotFound`] when the order does not
    /// exist.
    async fn record_reminder_sent(
        &self,
        payment_id: &PaymentId,
        kind: ReminderKind,
        sent_at: DateTime<Utc>,
    ) -> OrderRepositoryResult<bool>;
}

/// Errors returned by order repository implementations.
#[derive(Debug, Clone, Error)]
pub enum OrderRepositoryError {
    /// An order for the provider payment already exists.
    #[error("duplicate payment id: {0}")]
    DuplicatePaymentId(PaymentId),

    /// An order with the same reference already exists.
    #[error("duplicate order reference: {0}")]
    DuplicateReference(OrderReference),

    /// The order was not found.
    #[error("order not found for payment: {0}")]
    NotFound(PaymentId),

    /// The stored status no longer matches the status the writer read.
    #[error("order {payment_id} status changed: expected {expected}, found {actual}")]
    StatusConflict {
        /// Payment identifier of the contested order.
        payment_id: PaymentId,
        /// Status the writer based its change on.
        expected: OrderStatus,
        /// Status currently stored.
        actual: OrderStatus,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl OrderRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
