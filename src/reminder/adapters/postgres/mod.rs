//! `PostgreSQL` adapters for reminder task persistence.

mod models;
mod repository;
mod schema;

pub use repository::PostgresReminderTaskRepository;
