//! Port contracts for reminder task storage.

pub mod repository;

pub use repository::{
    ReminderTaskRepository, ReminderTaskRepositoryError, ReminderTaskRepositoryResult,
};
