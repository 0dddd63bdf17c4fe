//! # Task registry - deduplicated, insertion-ordered holding area.
//!
//! The same structure backs the pending-task set and both lifecycle callback
//! registries, so tasks and callbacks share one dedup rule.
//!
//! ## Rules
//! - Identity is the task allocation ([`TaskRef`] pointer), not the name.
//! - Re-adding a present task is a no-op and keeps its original position.
//! - [`drain_snapshot`](TaskRegistry::drain_snapshot) hands out everything in insertion
//!   order and leaves the registry empty, so tasks added while the snapshot runs wait
//!   for the next pass.
//! - The registry never runs user code; callers clone what they need and release the
//!   `RefCell` borrow before invoking anything.

use indexmap::IndexMap;

use crate::error::SchedulerError;
use crate::tasks::{identity, TaskRef};

/// One registered task or callback.
#[derive(Clone)]
struct Entry {
    task: TaskRef,
    /// Bumped on every fresh insertion; lets a stale handle tell its entry apart
    /// from a later re-registration of the same callback.
    generation: u64,
}

/// Result of [`TaskRegistry::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Added {
    pub(crate) key: usize,
    pub(crate) generation: u64,
    /// `false` when the task was already present.
    pub(crate) inserted: bool,
}

/// Insertion-ordered set of tasks keyed by identity.
#[derive(Default)]
pub(crate) struct TaskRegistry {
    entries: IndexMap<usize, Entry>,
    next_generation: u64,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts `task` unless it is already present.
    ///
    /// Fails with [`SchedulerError::InvalidArgument`] for tasks with an empty name.
    pub(crate) fn add(&mut self, task: TaskRef) -> Result<Added, SchedulerError> {
        validate(&task)?;

        let key = identity(&task);
        if let Some(existing) = self.entries.get(&key) {
            return Ok(Added {
                key,
                generation: existing.generation,
                inserted: false,
            });
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        self.entries.insert(key, Entry { task, generation });
        Ok(Added {
            key,
            generation,
            inserted: true,
        })
    }

    /// Removes the entry registered under `key` if it still belongs to `generation`.
    ///
    /// Order of the remaining entries is preserved.
    pub(crate) fn remove(&mut self, key: usize, generation: u64) -> bool {
        match self.entries.get(&key) {
            Some(entry) if entry.generation == generation => {
                self.entries.shift_remove(&key);
                true
            }
            _ => false,
        }
    }

    /// True if `key` is registered with `generation`.
    pub(crate) fn holds(&self, key: usize, generation: u64) -> bool {
        self.entries
            .get(&key)
            .is_some_and(|entry| entry.generation == generation)
    }

    /// True if this exact task is pending.
    pub(crate) fn contains(&self, task: &TaskRef) -> bool {
        self.entries.contains_key(&identity(task))
    }

    /// Returns all tasks in insertion order and empties the registry.
    pub(crate) fn drain_snapshot(&mut self) -> Vec<TaskRef> {
        self.entries.drain(..).map(|(_, entry)| entry.task).collect()
    }

    /// Returns all tasks in insertion order, leaving the registry untouched.
    pub(crate) fn snapshot(&self) -> Vec<TaskRef> {
        self.entries.values().map(|entry| entry.task.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rejects tasks that cannot be attributed in failure reports.
fn validate(task: &TaskRef) -> Result<(), SchedulerError> {
    if task.name().trim().is_empty() {
        return Err(SchedulerError::InvalidArgument {
            reason: "task name must not be empty",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskFn;
    use std::rc::Rc;

    fn noop(name: &'static str) -> TaskRef {
        TaskFn::rc(name, || Ok(()))
    }

    fn names(tasks: &[TaskRef]) -> Vec<String> {
        tasks.iter().map(|t| t.name().to_string()).collect()
    }

    #[test]
    fn add_dedups_by_identity() {
        let mut reg = TaskRegistry::new();
        let t1 = noop("t1");

        assert!(reg.add(t1.clone()).unwrap().inserted);
        assert!(!reg.add(Rc::clone(&t1)).unwrap().inserted);
        assert!(reg.add(noop("t1")).unwrap().inserted);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn drain_preserves_insertion_order_and_empties() {
        let mut reg = TaskRegistry::new();
        let (a, b, c) = (noop("a"), noop("b"), noop("c"));
        reg.add(a.clone()).unwrap();
        reg.add(b).unwrap();
        reg.add(c).unwrap();
        reg.add(a).unwrap();

        let drained = reg.drain_snapshot();
        assert_eq!(names(&drained), ["a", "b", "c"]);
        assert!(reg.is_empty());
        assert!(reg.drain_snapshot().is_empty());
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut reg = TaskRegistry::new();
        let err = reg.add(noop("  ")).unwrap_err();
        assert_eq!(err.as_label(), "invalid_argument");
        assert!(reg.is_empty());
    }

    #[test]
    fn remove_honours_generation() {
        let mut reg = TaskRegistry::new();
        let cb = noop("cb");

        let first = reg.add(cb.clone()).unwrap();
        assert!(reg.remove(first.key, first.generation));
        let second = reg.add(cb.clone()).unwrap();
        assert_eq!(first.key, second.key);
        assert_ne!(first.generation, second.generation);

        // A stale removal must not touch the re-registration.
        assert!(!reg.remove(first.key, first.generation));
        assert!(reg.holds(second.key, second.generation));
        assert!(reg.contains(&cb));
    }

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let mut reg = TaskRegistry::new();
        let (a, b, c) = (noop("a"), noop("b"), noop("c"));
        reg.add(a).unwrap();
        let mid = reg.add(b).unwrap();
        reg.add(c).unwrap();

        reg.remove(mid.key, mid.generation);
        assert_eq!(names(&reg.snapshot()), ["a", "c"]);
    }
}
