//! Port for the short-lived provisional checkout cache.

use crate::order::domain::{CachedCheckout, CheckoutSnapshot, PaymentId};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for cache operations.
pub type OrderCacheResult<T> = Result<T, OrderCacheError>;

/// Holds checkout snapshots keyed by provider payment id until the payer
/// interacts or the entry expires.
#[async_trait]
pub trait TemporaryOrderCache: Send + Sync {
    /// Stores a snapshot, replacing any previous entry for the payment.
    async fn put(
        &self,
        payment_id: &PaymentId,
        snapshot: CheckoutSnapshot,
    ) -> OrderCacheResult<()>;

    /// Returns the entry for the payment, if present.
    async fn get(&self, payment_id: &PaymentId) -> OrderCacheResult<Option<CachedCheckout>>;

    /// Removes the entry for the payment. Removing a missing entry succeeds.
    async fn evict(&self, payment_id: &PaymentId) -> OrderCacheResult<()>;

    /// Removes every entry older than `ttl` at `now` and returns how many
    /// were removed.
    async fn sweep(&self, now: DateTime<Utc>, ttl: Duration) -> OrderCacheResult<usize>;
}

/// Errors returned by cache implementations.
#[derive(Debug, Clone, Error)]
pub enum OrderCacheError {
    /// Backing store failure.
    #[error("order cache error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl OrderCacheError {
    /// Wraps a backing store error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
