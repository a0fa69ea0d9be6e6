//! Atelier: order payment lifecycle and reminder scheduling.
//!
//! This crate is the core of a made-to-order shop backend. It opens payments
//! with `PayPal`, Stripe, or Mollie, keeps provisional checkouts in a
//! temporary cache, persists an order once the payer engages, captures
//! payment without ever charging twice, and reminds payers who stall.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, HTTP, memory)
//!
//! # Modules
//!
//! - [`order`]: Checkout, persistence, capture, and status transitions
//! - [`reminder`]: Delayed reminder tasks and their polling loop
//! - [`config`]: Environment-driven configuration
//! - [`telemetry`]: Tracing subscriber setup
//! - [`clock`]: Manually driven clock for deterministic scheduling

pub mod clock;
pub mod config;
pub mod order;
pub mod reminder;
pub mod telemetry;
