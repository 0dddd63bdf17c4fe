//! # Closure-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn() -> Result<(), TaskError>`. The closure is
//! called once per batch the task is pending in; shared state goes through
//! `Rc<Cell<..>>` / `Rc<RefCell<..>>` captured explicitly.
//!
//! ## Example
//! ```rust
//! use turnbatch::{TaskFn, TaskRef, TaskError};
//!
//! let t: TaskRef = TaskFn::rc("layout", || {
//!     // do work...
//!     Ok::<_, TaskError>(())
//! });
//!
//! assert_eq!(t.name(), "layout");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use crate::error::TaskError;
use crate::tasks::task::Task;

/// Closure-backed task implementation.
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F>
where
    F: Fn() -> Result<(), TaskError> + 'static,
{
    /// Creates a new closure-backed task.
    ///
    /// Prefer [`TaskFn::rc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the task and returns it as a shared handle.
    ///
    /// ## Example
    /// ```rust
    /// use turnbatch::{TaskFn, TaskRef};
    ///
    /// let t: TaskRef = TaskFn::rc("hello", || Ok(()));
    /// assert_eq!(t.name(), "hello");
    /// ```
    pub fn rc(name: impl Into<Cow<'static, str>>, f: F) -> Rc<Self> {
        Rc::new(Self::new(name, f))
    }
}

impl<F> fmt::Debug for TaskFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFn").field("name", &self.name).finish()
    }
}

impl<F> Task for TaskFn<F>
where
    F: Fn() -> Result<(), TaskError> + 'static, // Fn, not FnMut
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> Result<(), TaskError> {
        (self.f)()
    }
}
