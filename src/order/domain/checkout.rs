//! Provisional checkout data held between intent creation and persistence.

use super::{
    CartItem, DeliveryDetails, Measurements, OrderReference, PaymentId, PaymentProviderKind,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Everything needed to turn a provider payment into a durable order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSnapshot {
    /// Provider that holds the payment.
    pub provider: PaymentProviderKind,
    /// Provider-assigned payment identifier.
    pub payment_id: PaymentId,
    /// Client idempotency key.
    pub order_reference: OrderReference,
    /// Cart lines frozen at intent-creation time.
    pub items: Vec<CartItem>,
    /// Sum of all line totals.
    pub total_amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Measurements submitted with the cart, if any.
    pub measurements: Option<Measurements>,
    /// Delivery details submitted with the cart, if any.
    pub delivery_details: Option<DeliveryDetails>,
}

/// A snapshot as stored in the temporary cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCheckout {
    /// Stored snapshot.
    pub snapshot: CheckoutSnapshot,
    /// When the snapshot was last written.
    pub cached_at: DateTime<Utc>,
}

impl CachedCheckout {
    /// Returns whether the entry is older than `ttl` at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.cached_at > ttl
    }
}
