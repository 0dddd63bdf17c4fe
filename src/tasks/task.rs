//! # Task abstraction.
//!
//! A [`Task`] is a named, synchronous unit of work that runs inside a batch.
//! The common handle type is [`TaskRef`], an `Rc<dyn Task>`.
//!
//! ## Identity
//! Two [`TaskRef`]s denote the same task when they point to the same allocation
//! (`Rc::ptr_eq`). Enqueueing clones of one `TaskRef` several times before a batch
//! runs results in a single invocation; two tasks built separately stay distinct
//! even if they share a name.

use std::rc::Rc;

use crate::error::TaskError;

/// Shared handle to a task. Cloning keeps the identity.
pub type TaskRef = Rc<dyn Task>;

/// # Synchronous unit of work.
///
/// A `Task` has a human-readable [`name`](Task::name) used in failure reports and a
/// [`run`](Task::run) method invoked once per batch it is pending in.
///
/// # Example
/// ```
/// use turnbatch::{Task, TaskError};
///
/// struct Repaint;
///
/// impl Task for Repaint {
///     fn name(&self) -> &str { "repaint" }
///
///     fn run(&self) -> Result<(), TaskError> {
///         // do work...
///         Ok(())
///     }
/// }
/// ```
pub trait Task: 'static {
    /// Returns a stable, human-readable task name. Must not be empty.
    fn name(&self) -> &str;

    /// Executes the task.
    ///
    /// Returning `Err` (or panicking, when panic isolation is enabled) is reported
    /// and does not affect the rest of the batch.
    fn run(&self) -> Result<(), TaskError>;
}

/// Identity key of a task: the address of its shared allocation.
///
/// Stable for as long as a registry holds the `Rc`, which is the only window in
/// which the key is compared.
#[inline]
pub(crate) fn identity(task: &TaskRef) -> usize {
    Rc::as_ptr(task) as *const () as usize
}
