//! Abandoned-checkout reminders.
//!
//! Orders awaiting the payer get an initial and a follow-up reminder task.
//! A polling loop claims due tasks with a lease, re-checks the order, and
//! delivers through the order notification gateway. Tasks are never deleted.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - The scheduler in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
