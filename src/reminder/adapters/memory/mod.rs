//! In-memory reminder task storage.

mod repository;

pub use repository::InMemoryReminderTaskRepository;
