//! Order payment lifecycle for Atelier.
//!
//! A checkout starts as a provisional entry in the temporary cache, becomes a
//! durable order once the payer interacts with the payment provider, and then
//! moves through capture, sync, admin updates, and cancellation. Paid orders
//! are locked, and duplicate charges are refused before any provider call.
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
