//! Adapter implementations for reminder task storage.

pub mod memory;
pub mod postgres;
