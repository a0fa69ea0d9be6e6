//! Checkout request types and catalog reservation bookkeeping.

use std::sync::Arc;

use chrono::Duration;
use tracing::warn;

use crate::order::{
    domain::{
        CartLineInput, DeliveryDetails, Measurements, PaymentProviderKind, ProductId,
    },
    ports::{CatalogService, ReservationOutcome},
};

/// Checkout defaults applied to every payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// ISO 4217 currency code charged for every order.
    pub currency: String,
    /// Where providers send the payer after approval.
    pub return_url: Option<String>,
    /// Where providers send the payer after aborting.
    pub cancel_url: Option<String>,
    /// How long after the follow-up reminder an unpaid order counts as
    /// abandoned.
    pub abandonment_window: Duration,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            currency: "EUR".to_owned(),
            return_url: None,
            cancel_url: None,
            abandonment_window: Duration::hours(48),
        }
    }
}

/// Request payload for creating a payment intent from a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIntentRequest {
    pub(crate) provider: PaymentProviderKind,
    pub(crate) lines: Vec<CartLineInput>,
    pub(crate) order_reference: Option<String>,
    pub(crate) measurements: Option<Measurements>,
    pub(crate) delivery_details: Option<DeliveryDetails>,
}

impl CreateIntentRequest {
    /// Creates a request for `lines` paid through `provider`.
    #[must_use]
    pub const fn new(provider: PaymentProviderKind, lines: Vec<CartLineInput>) -> Self {
        Self {
            provider,
            lines,
            order_reference: None,
            measurements: None,
            delivery_details: None,
        }
    }

    /// Sets the client idempotency key; one is generated when absent.
    #[must_use]
    pub fn with_order_reference(mut self, order_reference: impl Into<String>) -> Self {
        self.order_reference = Some(order_reference.into());
        self
    }

    /// Attaches body measurements.
    #[must_use]
    pub fn with_measurements(mut self, measurements: Measurements) -> Self {
        self.measurements = Some(measurements);
        self
    }

    /// Attaches delivery details.
    #[must_use]
    pub fn with_delivery_details(mut self, delivery_details: DeliveryDetails) -> Self {
        self.delivery_details = Some(delivery_details);
        self
    }
}

/// Products reserved for one checkout, released again on failure.
pub(crate) struct Reservations {
    catalog: Option<Arc<dyn CatalogService>>,
    held: Vec<ProductId>,
}

impl Reservations {
    pub(crate) fn new(catalog: Option<Arc<dyn CatalogService>>) -> Self {
        Self {
            catalog,
            held: Vec::new(),
        }
    }

    /// Reserves every product, stopping at the first unavailable one.
    ///
    /// Returns the unavailable product after releasing what was reserved.
    pub(crate) async fn reserve_all<'a>(
        &mut self,
        products: impl IntoIterator<Item = &'a ProductId>,
    ) -> Result<(), ProductId> {
        let Some(catalog) = self.catalog.clone() else {
            return Ok(());
        };
        for product_id in products {
            let available = match catalog.reserve(product_id).await {
                Ok(ReservationOutcome::Reserved) => true,
                Ok(outcome) => {
                    warn!(product_id = %product_id, ?outcome, "product not available");
                    false
                }
                Err(err) => {
                    warn!(product_id = %product_id, error = %err, "catalog reservation failed");
                    false
                }
            };
            if !available {
                self.release_all().await;
                return Err(product_id.clone());
            }
            self.held.push(product_id.clone());
        }
        Ok(())
    }

    /// Releases every reservation taken so far.
    pub(crate) async fn release_all(&mut self) {
        let Some(catalog) = self.catalog.as_ref() else {
            return;
        };
        for product_id in self.held.drain(..) {
            if let Err(err) = catalog.release(&product_id).await {
                warn!(product_id = %product_id, error = %err, "catalog release failed");
            }
        }
    }
}
