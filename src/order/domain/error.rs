//! Error types for order domain validation and parsing.

use super::{OrderStatus, PaymentId};
use thiserror::Error;

/// Errors returned while constructing or mutating order domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderDomainError {
    /// The cart contains no lines.
    #[error("cart must contain at least one item")]
    EmptyCart,

    /// A product identifier is empty after trimming.
    #[error("product id must not be empty")]
    EmptyProductId,

    /// A product name is empty after trimming.
    #[error("product name must not be empty for product {0}")]
    EmptyProductName(String),

    /// A cart line has a zero or negative price.
    #[error("price for product {product_id} must be positive, got {price}")]
    InvalidPrice {
        /// Offending product identifier.
        product_id: String,
        /// Rejected price in canonical decimal form.
        price: String,
    },

    /// A cart line has a zero or negative quantity.
    #[error("quantity for product {product_id} must be a positive integer, got {quantity}")]
    InvalidQuantity {
        /// Offending product identifier.
        product_id: String,
        /// Rejected quantity.
        quantity: i64,
    },

    /// A measurement value is missing a name or is not positive.
    #[error("invalid measurement '{0}'")]
    InvalidMeasurement(String),

    /// Delivery details are malformed.
    #[error("invalid delivery details: {0}")]
    InvalidDeliveryDetails(String),

    /// The order reference is empty, too long, or contains whitespace.
    #[error("invalid order reference '{0}'")]
    InvalidOrderReference(String),

    /// A payment identifier is empty after trimming.
    #[error("payment id must not be empty")]
    EmptyPaymentId,

    /// The order has already been paid and is locked against status changes.
    #[error("order for payment {0} is already paid")]
    AlreadyPaid(PaymentId),

    /// The order is in a terminal status and cannot change without an
    /// override.
    #[error("order for payment {payment_id} is already in terminal status {status}")]
    TerminalStatus {
        /// Payment identifier of the order.
        payment_id: PaymentId,
        /// Current terminal status.
        status: OrderStatus,
    },
}

/// Error returned while parsing order statuses from persistence or providers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown order status: {0}")]
pub struct ParseOrderStatusError(pub String);

/// Error returned while parsing fulfillment statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown fulfillment status: {0}")]
pub struct ParseFulfillmentStatusError(pub String);

/// Error returned while parsing payment provider identifiers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported payment provider: {0}")]
pub struct ParsePaymentProviderError(pub String);
