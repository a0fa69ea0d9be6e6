//! Domain model for the order payment lifecycle.
//!
//! The order domain covers cart snapshots, customer enrichment, and the
//! payment status state machine, including the paid lock and terminal-status
//! rules. Provider calls, caching, and storage stay outside this boundary.

mod cart;
mod checkout;
mod customer;
mod error;
mod ids;
mod order;
mod status;

pub use cart::{
    Cart, CartItem, CartLineInput, DeliveryDetails, Measurements, ShippingAddress, total_of,
};
pub use checkout::{CachedCheckout, CheckoutSnapshot};
pub use customer::Customer;
pub use error::{
    OrderDomainError, ParseFulfillmentStatusError, ParseOrderStatusError,
    ParsePaymentProviderError,
};
pub use ids::{OrderId, OrderReference, PaymentId, ProductId};
pub use order::{
    Cancellation, Order, PaymentAttempt, PersistedOrderData, ReminderLog, StatusChange,
};
pub use status::{FulfillmentStatus, OrderStatus, PaymentProviderKind, ReminderKind};
