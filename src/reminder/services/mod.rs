//! Application services for reminder scheduling.

mod scheduler;

pub use scheduler::{
    ReminderScheduler, ReminderSchedulerError, ReminderSchedulerResult, ReminderSettings,
    ScheduleOutcome, SkipReason, TickReport,
};
