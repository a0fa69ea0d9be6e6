//! In-memory catalog with time-limited reservations.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::order::{
    domain::ProductId,
    ports::{CatalogError, CatalogResult, CatalogService, ReservationOutcome},
};

/// How long a reservation blocks other checkouts before it may be taken over.
pub const DEFAULT_RESERVATION_TIMEOUT_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, Default)]
struct ProductState {
    reserved_at: Option<DateTime<Utc>>,
    sold: bool,
}

/// Thread-safe in-memory catalog of one-of-a-kind products.
#[derive(Debug, Clone)]
pub struct InMemoryCatalog<C>
where
    C: Clock + Send + Sync,
{
    products: Arc<RwLock<HashMap<ProductId, ProductState>>>,
    reservation_timeout: Duration,
    clock: Arc<C>,
}

impl<C> InMemoryCatalog<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a catalog offering `products`.
    #[must_use]
    pub fn new(products: impl IntoIterator<Item = ProductId>, clock: Arc<C>) -> Self {
        let stock = products
            .into_iter()
            .map(|product_id| (product_id, ProductState::default()))
            .collect();
        Self {
            products: Arc::new(RwLock::new(stock)),
            reservation_timeout: Duration::minutes(DEFAULT_RESERVATION_TIMEOUT_MINUTES),
            clock,
        }
    }

    /// Overrides how long a reservation stays exclusive.
    #[must_use]
    pub const fn with_reservation_timeout(mut self, timeout: Duration) -> Self {
        self.reservation_timeout = timeout;
        self
    }

    /// Returns whether the product holds a reservation that has not timed out.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownProduct`] for products outside the
    /// catalog.
    pub fn is_reserved(&self, product_id: &ProductId) -> CatalogResult<bool> {
        let now = self.clock.utc();
        self.with_product(product_id, |state| Ok(self.holds_fresh_reservation(state, now)))
    }

    /// Returns whether the product was sold.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownProduct`] for products outside the
    /// catalog.
    pub fn is_sold(&self, product_id: &ProductId) -> CatalogResult<bool> {
        self.with_product(product_id, |state| Ok(state.sold))
    }

    fn holds_fresh_reservation(&self, state: &ProductState, now: DateTime<Utc>) -> bool {
        state
            .reserved_at
            .is_some_and(|reserved_at| now - reserved_at < self.reservation_timeout)
    }

    fn with_product<T>(
        &self,
        product_id: &ProductId,
        f: impl FnOnce(&mut ProductState) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        let mut products = self
            .products
            .write()
            .map_err(|err| CatalogError::backend(std::io::Error::other(err.to_string())))?;
        let state = products
            .get_mut(product_id)
            .ok_or_else(|| CatalogError::UnknownProduct(product_id.clone()))?;
        f(state)
    }
}

#[async_trait]
impl<C> CatalogService for InMemoryCatalog<C>
where
    C: Clock + Send + Sync,
{
    async fn reserve(&self, product_id: &ProductId) -> CatalogResult<ReservationOutcome> {
        let now = self.clock.utc();
        self.with_product(product_id, |state| {
            if state.sold {
                return Ok(ReservationOutcome::Sold);
            }
            if self.holds_fresh_reservation(state, now) {
                return Ok(ReservationOutcome::AlreadyReserved);
            }
            state.reserved_at = Some(now);
            Ok(ReservationOutcome::Reserved)
        })
    }

    async fn release(&self, product_id: &ProductId) -> CatalogResult<()> {
        self.with_product(product_id, |state| {
            state.reserved_at = None;
            Ok(())
        })
    }

    async fn finalize(&self, product_id: &ProductId) -> CatalogResult<()> {
        self.with_product(product_id, |state| {
            state.reserved_at = None;
            state.sold = true;
            Ok(())
        })
    }
}
