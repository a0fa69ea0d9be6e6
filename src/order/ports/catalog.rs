//! Catalog reservation port for one-of-a-kind products.

use crate::order::domain::ProductId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Outcome of a reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// The product is now held for this checkout.
    Reserved,
    /// Another checkout holds a fresh reservation.
    AlreadyReserved,
    /// The product was already sold.
    Sold,
}

/// Holds and releases products while a checkout is in flight.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Attempts to reserve a product.
    async fn reserve(&self, product_id: &ProductId) -> CatalogResult<ReservationOutcome>;

    /// Releases a reservation. Releasing an unreserved product succeeds.
    async fn release(&self, product_id: &ProductId) -> CatalogResult<()>;

    /// Marks a reserved product as sold.
    async fn finalize(&self, product_id: &ProductId) -> CatalogResult<()>;
}

/// Errors returned by catalog implementations.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// The product is not in the catalog.
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),

    /// Backing store failure.
    #[error("catalog error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl CatalogError {
    /// Wraps a backing store error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
