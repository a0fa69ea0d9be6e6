//! `PostgreSQL` adapters for durable order persistence.

mod models;
mod repository;
mod schema;

pub use repository::{OrderPgPool, PostgresOrderRepository};
