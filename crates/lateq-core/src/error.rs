use thiserror::Error;

use crate::domain::TaskId;

/// Failures surfaced by a queue engine.
///
/// All of these are returned to the client as an error response; none of them
/// tear down the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The pool is empty and no expired lease could be reclaimed.
    #[error("no task is available right now")]
    NoAvailableTask,

    #[error("task {0} is unknown or not currently leased")]
    UnknownOrNotLeased(TaskId),

    #[error("lock does not match the current lease on task {0}")]
    LeaseMismatch(TaskId),

    /// Invariant violation: the engine tried to lease a task twice.
    #[error("task {0} is already leased")]
    AlreadyLeased(TaskId),

    #[error("task {0} not found")]
    NotFound(TaskId),
}

impl SchedulerError {
    /// Stable machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulerError::NoAvailableTask => "no_available_task",
            SchedulerError::UnknownOrNotLeased(_) => "unknown_or_not_leased",
            SchedulerError::LeaseMismatch(_) => "lease_mismatch",
            SchedulerError::AlreadyLeased(_) => "already_leased",
            SchedulerError::NotFound(_) => "not_found",
        }
    }
}
