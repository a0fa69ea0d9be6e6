//! Error types for reminder task state changes and parsing.

use super::{ReminderTaskId, ReminderTaskStatus};
use thiserror::Error;

/// Errors returned while mutating reminder tasks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReminderDomainError {
    /// Completed and cancelled tasks are immutable history.
    #[error("reminder task {task_id} is {status}, not pending")]
    TaskNotPending {
        /// Offending task identifier.
        task_id: ReminderTaskId,
        /// Current status.
        status: ReminderTaskStatus,
    },
}

/// Error returned while parsing reminder task types from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown reminder task type: {0}")]
pub struct ParseReminderTaskTypeError(pub String);

/// Error returned while parsing reminder task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown reminder task status: {0}")]
pub struct ParseReminderTaskStatusError(pub String);
