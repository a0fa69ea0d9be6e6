//! Step definitions for order lifecycle BDD scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
