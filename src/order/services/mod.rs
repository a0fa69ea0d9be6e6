//! Application services for the order payment lifecycle.

mod cache_sweeper;
mod checkout;
mod lifecycle;

pub use cache_sweeper::{CacheSettings, CacheSweeper, SweeperHandle};
pub use checkout::{CheckoutSettings, CreateIntentRequest};
pub use lifecycle::{
    ErrorKind, OrderLifecycleError, OrderLifecycleResult, OrderLifecycleService,
    UpdateStatusRequest,
};
