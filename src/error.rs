use std::fmt;

use thiserror::Error as ThisError;

use crate::task::Task;

/// Every failure the crate reports.
///
/// A `Violation` means the application broke the concurrency protocol it
/// declared; it is raised at the exact access that broke it and is never
/// retried. `Internal` means the framework itself is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    #[error("Intent Violation: {0}")]
    Violation(String),

    #[error("Internal Error: {0}")]
    Internal(String),

    #[error("Interrupted while waiting")]
    Interrupted,

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Task Panicked: {0}")]
    Panicked(String),
}

impl Error {
    #[inline]
    pub fn violation(msg: impl Into<String>) -> Self {
        Error::Violation(msg.into())
    }

    /// Violation attributed to the calling task.
    pub fn task_violation(what: impl fmt::Display) -> Self {
        Error::Violation(format!("task '{}' {}", Task::current(), what))
    }

    #[inline]
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    #[inline]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, Error::Violation(_))
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
