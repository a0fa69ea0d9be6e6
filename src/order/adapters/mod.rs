//! Adapter implementations for order ports.
//!
//! - [`memory`]: thread-safe in-memory adapters for tests
//! - [`postgres`]: Diesel-backed durable order storage
//! - [`providers`]: `PayPal`, Stripe, and Mollie HTTP clients plus the
//!   provider registry
//! - [`webhook`]: notification delivery through a mail-service webhook

pub mod memory;
pub mod postgres;
pub mod providers;
pub mod webhook;
