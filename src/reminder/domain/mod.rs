//! Domain model for delayed abandoned-checkout reminders.

mod error;
mod task;

pub use error::{ParseReminderTaskStatusError, ParseReminderTaskTypeError, ReminderDomainError};
pub use task::{
    PersistedReminderTaskData, ReminderTask, ReminderTaskId, ReminderTaskStatus,
    ReminderTaskType,
};
