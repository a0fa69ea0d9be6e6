//! HTTP adapters for the supported payment providers.
//!
//! Each client implements [`PaymentProvider`] and owns the mapping from its
//! native status vocabulary onto the shared order status.
//!
//! [`PaymentProvider`]: crate::order::ports::PaymentProvider

mod http;
pub mod mollie;
pub mod paypal;
mod registry;
pub mod stripe;

#[cfg(test)]
mod provider_tests;

pub use mollie::MollieProvider;
pub use paypal::PaypalProvider;
pub use registry::ProviderRegistry;
pub use stripe::StripeProvider;
