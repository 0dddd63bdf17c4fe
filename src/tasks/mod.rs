//! # Task abstractions.
//!
//! This module provides the core task-related types:
//! - [`Task`] - trait for synchronous, zero-argument units of work
//! - [`TaskFn`] - closure-backed task implementation
//! - [`TaskRef`] - shared reference to a task (`Rc<dyn Task>`); its allocation is the task identity
//!
//! Lifecycle callbacks registered with
//! [`Scheduler::on_before_flush`](crate::Scheduler::on_before_flush) and
//! [`Scheduler::on_after_flush`](crate::Scheduler::on_after_flush) use the same types.

mod task;
mod task_fn;

pub use task::{Task, TaskRef};
pub use task_fn::TaskFn;

pub(crate) use task::identity;
