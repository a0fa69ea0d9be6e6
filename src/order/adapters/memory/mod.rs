//! In-memory adapter implementations.
//!
//! These adapters are thread-safe and need no external services. They back
//! unit and behaviour tests and single-process demos.

mod cache;
mod catalog;
mod notification;
mod order;
mod provider;

pub use cache::InMemoryTemporaryOrderCache;
pub use catalog::{DEFAULT_RESERVATION_TIMEOUT_MINUTES, InMemoryCatalog};
pub use notification::{RecordingNotificationGateway, SentNotification};
pub use order::InMemoryOrderRepository;
pub use provider::InMemoryPaymentProvider;
