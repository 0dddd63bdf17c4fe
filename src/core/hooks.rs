//! # Lifecycle callback registries (pre-flush / post-flush).
//!
//! Each scheduler owns two [`CallbackRegistry`]s. Registration returns a
//! [`RegistrationHandle`] that removes exactly that callback.
//!
//! ```text
//! on_before_flush(cb) ─► before: CallbackRegistry ─┐
//!                                                   ├─► invoke_all(phase) during each batch
//! on_after_flush(cb)  ─► after:  CallbackRegistry ─┘
//! ```
//!
//! ## Rules
//! - Dedup by identity (same structure as the task registry).
//! - `invoke_all` iterates a snapshot: callbacks may register/unregister while it runs;
//!   such changes take effect from the next batch.
//! - Every failure is handed to the caller-supplied reporter and iteration continues.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::batch::invoke;
use crate::core::registry::TaskRegistry;
use crate::error::{SchedulerError, TaskError};
use crate::events::FlushPhase;
use crate::tasks::TaskRef;

/// Callback registries share the task registry's dedup semantics.
pub(crate) type CallbackRegistry = TaskRegistry;

/// Registers `callback` and returns a handle bound to its entry.
pub(crate) fn register(
    registry: &Rc<RefCell<CallbackRegistry>>,
    phase: FlushPhase,
    callback: TaskRef,
) -> Result<RegistrationHandle, SchedulerError> {
    let added = registry.borrow_mut().add(callback)?;
    Ok(RegistrationHandle {
        registry: Rc::downgrade(registry),
        key: added.key,
        generation: added.generation,
        phase,
        released: Cell::new(false),
    })
}

/// Invokes a snapshot of `registry`, isolating failures.
///
/// Returns how many callbacks failed.
pub(crate) fn invoke_all(
    registry: &RefCell<CallbackRegistry>,
    catch_panics: bool,
    mut report: impl FnMut(&TaskRef, TaskError),
) -> usize {
    let callbacks = registry.borrow().snapshot();
    let mut failed = 0;
    for cb in &callbacks {
        if let Err(err) = invoke(cb.as_ref(), catch_panics) {
            failed += 1;
            report(cb, err);
        }
    }
    failed
}

/// Handle returned by [`Scheduler::on_before_flush`](crate::Scheduler::on_before_flush)
/// and [`Scheduler::on_after_flush`](crate::Scheduler::on_after_flush).
///
/// Dropping the handle keeps the callback registered; call
/// [`unregister`](Self::unregister) to remove it.
pub struct RegistrationHandle {
    registry: Weak<RefCell<CallbackRegistry>>,
    key: usize,
    generation: u64,
    phase: FlushPhase,
    released: Cell<bool>,
}

impl RegistrationHandle {
    /// Removes the callback this handle was issued for.
    ///
    /// Idempotent: returns `true` only for the call that actually removed the entry.
    /// Calling it again, after the scheduler was dropped, or after another handle for
    /// the same registration already removed it is a no-op.
    ///
    /// Must not be called while the registry is being mutated by the same thread,
    /// which cannot happen from inside a callback: `invoke_all` holds no borrow while
    /// user code runs.
    pub fn unregister(&self) -> bool {
        if self.released.replace(true) {
            return false;
        }
        match self.registry.upgrade() {
            Some(registry) => registry.borrow_mut().remove(self.key, self.generation),
            None => false,
        }
    }

    /// True while the callback is still registered through this handle.
    pub fn is_registered(&self) -> bool {
        if self.released.get() {
            return false;
        }
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.borrow().holds(self.key, self.generation))
    }

    /// Which registry the callback belongs to.
    pub fn phase(&self) -> FlushPhase {
        self.phase
    }
}

impl fmt::Debug for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationHandle")
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("released", &self.released.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskFn;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> TaskRef {
        let log = log.clone();
        TaskFn::rc(name, move || {
            log.borrow_mut().push(name);
            Ok(())
        })
    }

    #[test]
    fn duplicate_registration_invokes_once() {
        let reg = Rc::new(RefCell::new(CallbackRegistry::new()));
        let log = Rc::new(RefCell::new(Vec::new()));
        let cb = recorder(&log, "p");

        let h1 = register(&reg, FlushPhase::Before, cb.clone()).unwrap();
        let h2 = register(&reg, FlushPhase::Before, cb).unwrap();
        invoke_all(&reg, true, |_, _| {});

        assert_eq!(*log.borrow(), ["p"]);
        assert!(h1.is_registered() && h2.is_registered());
    }

    #[test]
    fn unregister_is_idempotent() {
        let reg = Rc::new(RefCell::new(CallbackRegistry::new()));
        let log = Rc::new(RefCell::new(Vec::new()));
        let keep = register(&reg, FlushPhase::After, recorder(&log, "keep")).unwrap();
        let gone = register(&reg, FlushPhase::After, recorder(&log, "gone")).unwrap();

        assert!(gone.unregister());
        assert!(!gone.unregister());
        assert!(!gone.is_registered());
        invoke_all(&reg, true, |_, _| {});

        assert_eq!(*log.borrow(), ["keep"]);
        assert!(keep.is_registered());
        assert_eq!(keep.phase(), FlushPhase::After);
    }

    #[test]
    fn unregister_after_registry_dropped_is_noop() {
        let reg = Rc::new(RefCell::new(CallbackRegistry::new()));
        let h = register(&reg, FlushPhase::Before, TaskFn::rc("x", || Ok(()))).unwrap();
        drop(reg);
        assert!(!h.is_registered());
        assert!(!h.unregister());
    }

    #[test]
    fn failures_are_isolated_and_reported() {
        let reg = Rc::new(RefCell::new(CallbackRegistry::new()));
        let log = Rc::new(RefCell::new(Vec::new()));
        register(&reg, FlushPhase::Before, recorder(&log, "first")).unwrap();
        register(
            &reg,
            FlushPhase::Before,
            TaskFn::rc("err", || Err(TaskError::fail("nope"))),
        )
        .unwrap();
        register(
            &reg,
            FlushPhase::Before,
            TaskFn::rc("panics", || panic!("kaboom")),
        )
        .unwrap();
        register(&reg, FlushPhase::Before, recorder(&log, "last")).unwrap();

        let mut reported = Vec::new();
        let failed = invoke_all(&reg, true, |cb, err| {
            reported.push((cb.name().to_string(), err.as_label()));
        });

        assert_eq!(failed, 2);
        assert_eq!(*log.borrow(), ["first", "last"]);
        assert_eq!(
            reported,
            [
                ("err".to_string(), "task_failed"),
                ("panics".to_string(), "task_panicked")
            ]
        );
    }

    #[test]
    fn removal_during_iteration_applies_next_pass() {
        let reg = Rc::new(RefCell::new(CallbackRegistry::new()));
        let log = Rc::new(RefCell::new(Vec::new()));
        let victim = Rc::new(RefCell::new(None::<RegistrationHandle>));

        let v = victim.clone();
        register(
            &reg,
            FlushPhase::After,
            TaskFn::rc("remover", move || {
                if let Some(h) = v.borrow().as_ref() {
                    h.unregister();
                }
                Ok(())
            }),
        )
        .unwrap();
        *victim.borrow_mut() =
            Some(register(&reg, FlushPhase::After, recorder(&log, "victim")).unwrap());

        invoke_all(&reg, true, |_, _| {});
        invoke_all(&reg, true, |_, _| {});
        assert_eq!(*log.borrow(), ["victim"]);
    }
}
