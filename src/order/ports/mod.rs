//! Port contracts for the order payment lifecycle.
//!
//! Ports define infrastructure-agnostic interfaces used by order services:
//! durable storage, the provisional checkout cache, payment providers,
//! customer notifications, and catalog reservations.

pub mod cache;
pub mod catalog;
pub mod notification;
pub mod provider;
pub mod repository;

pub use cache::{OrderCacheError, OrderCacheResult, TemporaryOrderCache};
pub use catalog::{CatalogError, CatalogResult, CatalogService, ReservationOutcome};
pub use notification::{NotificationError, NotificationGateway, NotificationResult};
pub use provider::{
    PaymentIntentRequest, PaymentProvider, PaymentProviderError, ProviderPayment, ProviderResult,
};
pub use repository::{OrderRepository, OrderRepositoryError, OrderRepositoryResult};
