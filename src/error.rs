//! Error types used by the scheduler and by tasks.
//!
//! This module defines three enums:
//!
//! - [`SchedulerError`]: usage errors raised synchronously to the caller of
//!   [`Scheduler::enqueue`](crate::Scheduler::enqueue) and the callback registration methods.
//! - [`TaskError`]: failures of individual tasks or lifecycle callbacks during a batch.
//! - [`DeferError`]: the deferred-execution bridge could not accept a callback.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use thiserror::Error;

/// # Usage errors produced by the scheduler API.
///
/// Raised synchronously and never retried; the caller must fix the call site.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The supplied task or callback cannot be registered.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: &'static str,
    },
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use turnbatch::SchedulerError;
    ///
    /// let err = SchedulerError::InvalidArgument { reason: "task name must not be empty" };
    /// assert_eq!(err.as_label(), "invalid_argument");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::InvalidArgument { .. } => "invalid_argument",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SchedulerError::InvalidArgument { reason } => format!("invalid argument: {reason}"),
        }
    }
}

/// # Errors produced while executing a task or a lifecycle callback.
///
/// These never escape a batch: the executor isolates them, reports them and
/// moves on to the next unit of work.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task returned an error.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The task panicked; the panic was caught by the batch executor.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use turnbatch::TaskError;
    ///
    /// let err = TaskError::fail("boom");
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
        }
    }

    /// True if the error was synthesized from a caught panic.
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked { .. })
    }
}

/// Lets a task enqueue follow-up work with `?`.
impl From<SchedulerError> for TaskError {
    fn from(err: SchedulerError) -> Self {
        TaskError::Fail {
            error: err.to_string(),
        }
    }
}

/// # Errors produced by a deferred-execution bridge.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeferError {
    /// The executor behind the bridge has shut down and no longer accepts work.
    #[error("{strategy} bridge is closed")]
    Closed {
        /// Name of the bridge strategy that refused the callback.
        strategy: &'static str,
    },

    /// The bridge cannot schedule from the current context (for example
    /// `spawn_local` outside a `LocalSet`).
    #[error("{strategy} bridge unavailable: {reason}")]
    Unavailable {
        /// Name of the bridge strategy that refused the callback.
        strategy: &'static str,
        /// What is missing.
        reason: String,
    },
}

impl DeferError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeferError::Closed { .. } => "defer_closed",
            DeferError::Unavailable { .. } => "defer_unavailable",
        }
    }
}

/// Renders a panic payload the same way for tasks, callbacks and subscribers.
pub(crate) fn panic_info(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
