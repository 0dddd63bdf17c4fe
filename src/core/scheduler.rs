//! # Scheduler: the public handle.
//!
//! The [`Scheduler`] owns the task registry, both callback registries, the
//! scheduling state machine, the deferred-execution bridge and the event bus.
//! It is a cheap `Rc` handle: clone it into tasks that need to enqueue more work.
//! Lifecycle callbacks stay registered for as long as the scheduler lives, so a
//! callback owning a `Scheduler` clone forms an `Rc` cycle that is never freed;
//! give callbacks a [`WeakScheduler`] from [`Scheduler::downgrade`] instead.
//!
//! ## High-level architecture
//! ```text
//! enqueue(task) ──► TaskRegistry.add (dedup) ──► request_dispatch()
//!                                                   │ Idle → DispatchPending
//!                                                   ▼
//!                                        bridge.defer(run_deferred)
//!                                                   │ next turn
//!                                                   ▼
//!                         batch::run:  before-callbacks → tasks → after-callbacks
//!                                                   │
//!                                                   ▼
//!                                    Idle  (+ CompletionSignal, BatchFinished)
//! ```
//!
//! ## Example
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use turnbatch::{Config, Scheduler, TaskFn, TaskRef};
//!
//! let sched = Scheduler::new(Config::default());
//! let hits = Rc::new(Cell::new(0));
//!
//! let h = hits.clone();
//! let repaint: TaskRef = TaskFn::rc("repaint", move || {
//!     h.set(h.get() + 1);
//!     Ok(())
//! });
//!
//! // Three producers ask for the same repaint before the next turn.
//! for _ in 0..3 {
//!     sched.enqueue(repaint.clone()).unwrap();
//! }
//! sched.flush_sync();
//! assert_eq!(hits.get(), 1);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tokio::sync::{broadcast, oneshot};

use crate::bridge::Defer;
use crate::core::batch::BatchReport;
use crate::core::builder::SchedulerBuilder;
use crate::core::completion::CompletionSignal;
use crate::core::config::Config;
use crate::core::dispatch::{self, Dispatcher};
use crate::core::hooks::{self, CallbackRegistry, RegistrationHandle};
use crate::core::registry::TaskRegistry;
use crate::error::SchedulerError;
use crate::events::{Bus, Event, FlushPhase};
use crate::tasks::TaskRef;

/// State shared by every clone of a [`Scheduler`] and by pending bridge callbacks.
pub(crate) struct Shared {
    pub(crate) cfg: Config,
    pub(crate) bus: Bus,
    pub(crate) tasks: RefCell<TaskRegistry>,
    pub(crate) before: Rc<RefCell<CallbackRegistry>>,
    pub(crate) after: Rc<RefCell<CallbackRegistry>>,
    pub(crate) dispatcher: Rc<Dispatcher>,
    pub(crate) bridge: Box<dyn Defer>,
    completion: CompletionSignal,
    /// Dropped with the scheduler; stops the subscriber listener and its workers.
    _stop_subscribers: Option<oneshot::Sender<()>>,
}

impl Shared {
    pub(crate) fn new(
        cfg: Config,
        bus: Bus,
        bridge: Box<dyn Defer>,
        stop_subscribers: Option<oneshot::Sender<()>>,
    ) -> Self {
        let dispatcher = Rc::new(Dispatcher::new());
        Self {
            cfg,
            bus,
            tasks: RefCell::new(TaskRegistry::new()),
            before: Rc::new(RefCell::new(CallbackRegistry::new())),
            after: Rc::new(RefCell::new(CallbackRegistry::new())),
            completion: CompletionSignal::new(Rc::clone(&dispatcher)),
            dispatcher,
            bridge,
            _stop_subscribers: stop_subscribers,
        }
    }
}

/// Coalesces deferred work into one batch per turn.
///
/// Single-threaded: the handle is `!Send`. All methods may be called from inside
/// tasks and lifecycle callbacks.
#[derive(Clone)]
pub struct Scheduler {
    shared: Rc<Shared>,
}

impl Scheduler {
    /// Creates a scheduler whose bridge is picked by [`bridge::detect`](crate::bridge::detect).
    pub fn new(cfg: Config) -> Self {
        SchedulerBuilder::new(cfg).build()
    }

    /// Creates a scheduler on an explicit bridge.
    pub fn with_bridge(cfg: Config, bridge: impl Defer) -> Self {
        SchedulerBuilder::new(cfg).with_bridge(bridge).build()
    }

    /// Returns a builder for schedulers with subscribers or a custom bridge.
    pub fn builder(cfg: Config) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    pub(crate) fn from_shared(shared: Rc<Shared>) -> Self {
        Self { shared }
    }

    /// Adds `task` to the next batch and requests a deferred dispatch.
    ///
    /// Enqueueing a task that is already pending is a no-op. A task enqueued while a
    /// batch runs (including by a task of that batch) runs in a later batch.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidArgument`] if the task name is empty.
    pub fn enqueue(&self, task: TaskRef) -> Result<(), SchedulerError> {
        let added = self.shared.tasks.borrow_mut().add(task)?;
        if !added.inserted {
            tracing::trace!(scheduler = %self.shared.cfg.name, "task already pending");
        }
        dispatch::request_dispatch(&self.shared);
        Ok(())
    }

    /// Requests a deferred batch. Idempotent while a batch is pending or running.
    pub fn flush(&self) {
        dispatch::request_dispatch(&self.shared);
    }

    /// Runs a batch right now, unless one is already running (then returns `None`).
    ///
    /// A deferred dispatch requested earlier is not cancelled: it still fires and
    /// runs whatever is pending by then.
    pub fn flush_sync(&self) -> Option<BatchReport> {
        dispatch::force_dispatch_now(&self.shared)
    }

    /// Registers a callback that runs at the start of every batch, before any task.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidArgument`] if the callback name is empty.
    pub fn on_before_flush(&self, callback: TaskRef) -> Result<RegistrationHandle, SchedulerError> {
        hooks::register(&self.shared.before, FlushPhase::Before, callback)
    }

    /// Registers a callback that runs at the end of every batch, after all tasks,
    /// even if a task failed or panicked.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidArgument`] if the callback name is empty.
    pub fn on_after_flush(&self, callback: TaskRef) -> Result<RegistrationHandle, SchedulerError> {
        hooks::register(&self.shared.after, FlushPhase::After, callback)
    }

    /// The scheduler's completion signal. Always the same handle.
    pub fn completion(&self) -> &CompletionSignal {
        &self.shared.completion
    }

    /// Number of tasks waiting for the next batch.
    pub fn pending(&self) -> usize {
        self.shared.tasks.borrow().len()
    }

    /// True if this exact task waits for the next batch.
    pub fn is_pending(&self, task: &TaskRef) -> bool {
        self.shared.tasks.borrow().contains(task)
    }

    /// Number of batches finished so far.
    pub fn completed_batches(&self) -> u64 {
        self.shared.dispatcher.finished_batches()
    }

    /// Subscribes to scheduler events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }

    /// The configuration this scheduler was built with.
    pub fn config(&self) -> &Config {
        &self.shared.cfg
    }

    /// Name of the bridge strategy in use (`"tokio"`, `"settled"`, ...).
    pub fn bridge_strategy(&self) -> &'static str {
        self.shared.bridge.strategy()
    }

    /// Drives the bridge's executor if the bridge owns one (see [`Defer::run_until_stalled`]).
    pub fn run_until_stalled(&self) -> bool {
        self.shared.bridge.run_until_stalled()
    }

    /// Returns a handle that does not keep the scheduler alive.
    pub fn downgrade(&self) -> WeakScheduler {
        WeakScheduler {
            shared: Rc::downgrade(&self.shared),
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> dispatch::SchedulerState {
        self.shared.dispatcher.state()
    }
}

/// Non-owning [`Scheduler`] handle, for lifecycle callbacks that call back into
/// the scheduler.
#[derive(Clone)]
pub struct WeakScheduler {
    shared: Weak<Shared>,
}

impl WeakScheduler {
    /// The scheduler, if it is still alive.
    pub fn upgrade(&self) -> Option<Scheduler> {
        self.shared.upgrade().map(Scheduler::from_shared)
    }
}

impl fmt::Debug for WeakScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakScheduler")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.shared.cfg.name)
            .field("state", &self.shared.dispatcher.state())
            .field("pending", &self.pending())
            .field("bridge", &self.bridge_strategy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{DeferredFn, SettledBridge};
    use crate::core::dispatch::SchedulerState;
    use crate::error::{DeferError, TaskError};
    use crate::events::EventKind;
    use crate::tasks::TaskFn;
    use std::cell::Cell;

    type Log = Rc<RefCell<Vec<String>>>;

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn rec(log: &Log, name: &'static str) -> TaskRef {
        let log = log.clone();
        TaskFn::rc(name, move || {
            log.borrow_mut().push(name.to_string());
            Ok(())
        })
    }

    /// Bridge that only counts requests; the test fires them by hand.
    #[derive(Clone, Default)]
    struct ManualBridge {
        queued: Rc<RefCell<Vec<DeferredFn>>>,
        requests: Rc<Cell<usize>>,
    }

    impl ManualBridge {
        fn fire_next(&self) -> bool {
            let next = {
                let mut queued = self.queued.borrow_mut();
                if queued.is_empty() {
                    return false;
                }
                queued.remove(0)
            };
            next();
            true
        }

        fn fire_all(&self) {
            loop {
                let next = self.queued.borrow_mut().drain(..).collect::<Vec<_>>();
                if next.is_empty() {
                    break;
                }
                for cb in next {
                    cb();
                }
            }
        }
    }

    impl Defer for ManualBridge {
        fn defer(&self, callback: DeferredFn) -> Result<(), DeferError> {
            self.requests.set(self.requests.get() + 1);
            self.queued.borrow_mut().push(callback);
            Ok(())
        }
        fn strategy(&self) -> &'static str {
            "manual"
        }
    }

    struct ClosedBridge;

    impl Defer for ClosedBridge {
        fn defer(&self, _callback: DeferredFn) -> Result<(), DeferError> {
            Err(DeferError::Closed { strategy: "closed" })
        }
        fn strategy(&self) -> &'static str {
            "closed"
        }
    }

    fn manual() -> (Scheduler, ManualBridge) {
        let bridge = ManualBridge::default();
        (Scheduler::with_bridge(Config::default(), bridge.clone()), bridge)
    }

    #[test]
    fn duplicate_enqueue_runs_once() {
        let (sched, bridge) = manual();
        let log = log();
        let t1 = rec(&log, "t1");
        let t2 = rec(&log, "t2");

        sched.enqueue(t1.clone()).unwrap();
        sched.enqueue(t1).unwrap();
        sched.enqueue(t2).unwrap();
        assert_eq!(sched.pending(), 2);
        bridge.fire_all();

        assert_eq!(*log.borrow(), ["t1", "t2"]);
        assert_eq!(sched.completed_batches(), 1);
    }

    #[test]
    fn many_requests_produce_one_dispatch() {
        let (sched, bridge) = manual();
        let log = log();
        sched.enqueue(rec(&log, "a")).unwrap();
        for _ in 0..10 {
            sched.flush();
        }
        sched.enqueue(rec(&log, "b")).unwrap();

        assert_eq!(bridge.requests.get(), 1);
        assert_eq!(sched.state(), SchedulerState::DispatchPending);
        bridge.fire_all();
        assert_eq!(sched.completed_batches(), 1);
        assert_eq!(sched.state(), SchedulerState::Idle);
    }

    #[test]
    fn preserves_insertion_order() {
        let (sched, bridge) = manual();
        let log = log();
        for name in ["a", "b", "c"] {
            sched.enqueue(rec(&log, name)).unwrap();
        }
        bridge.fire_all();
        assert_eq!(*log.borrow(), ["a", "b", "c"]);
    }

    #[test]
    fn callbacks_bracket_tasks() {
        let (sched, bridge) = manual();
        let log = log();
        sched.on_before_flush(rec(&log, "P")).unwrap();
        sched.on_after_flush(rec(&log, "Q")).unwrap();
        sched.enqueue(rec(&log, "T")).unwrap();
        bridge.fire_all();
        assert_eq!(*log.borrow(), ["P", "T", "Q"]);
    }

    #[test]
    fn failures_are_isolated() {
        let (sched, bridge) = manual();
        let log = log();
        sched
            .on_before_flush(TaskFn::rc("bad-pre", || Err(TaskError::fail("pre"))))
            .unwrap();
        sched.on_before_flush(rec(&log, "pre")).unwrap();
        sched.on_after_flush(rec(&log, "post")).unwrap();
        sched.enqueue(rec(&log, "a")).unwrap();
        sched
            .enqueue(TaskFn::rc("throws", || Err(TaskError::fail("boom"))))
            .unwrap();
        sched.enqueue(TaskFn::rc("panics", || panic!("boom"))).unwrap();
        sched.enqueue(rec(&log, "b")).unwrap();

        bridge.fire_all();
        assert_eq!(*log.borrow(), ["pre", "a", "b", "post"]);
        assert_eq!(sched.state(), SchedulerState::Idle);
    }

    #[test]
    fn failures_are_reported_on_the_bus() {
        let (sched, _bridge) = manual();
        let mut rx = sched.subscribe();
        sched
            .enqueue(TaskFn::rc("throws", || Err(TaskError::fail("boom"))))
            .unwrap();
        sched
            .on_after_flush(TaskFn::rc("post", || panic!("late")))
            .unwrap();

        let report = sched.flush_sync().unwrap();
        assert_eq!((report.ran, report.failed), (1, 1));

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|ev| ev.kind)
            .collect();
        assert_eq!(
            kinds,
            [
                EventKind::DispatchRequested,
                EventKind::BatchStarting,
                EventKind::TaskFailed,
                EventKind::CallbackPanicked,
                EventKind::BatchFinished,
            ]
        );
    }

    #[test]
    fn reentrant_enqueue_runs_in_next_batch() {
        let (sched, bridge) = manual();
        let log = log();
        let late = rec(&log, "late");

        let (s, l, lg) = (sched.clone(), late.clone(), log.clone());
        sched
            .enqueue(TaskFn::rc("spawner", move || {
                lg.borrow_mut().push("spawner".into());
                s.enqueue(l.clone())?;
                assert!(s.is_pending(&l));
                Ok(())
            }))
            .unwrap();
        sched.on_after_flush(rec(&log, "end")).unwrap();

        assert!(bridge.fire_next());
        assert_eq!(*log.borrow(), ["spawner", "end"]);

        // The finalizer requested a new batch for the late task.
        assert_eq!(sched.state(), SchedulerState::DispatchPending);
        assert_eq!(bridge.requests.get(), 2);

        assert!(bridge.fire_next());
        assert_eq!(*log.borrow(), ["spawner", "end", "late", "end"]);
        assert_eq!(sched.completed_batches(), 2);
        assert!(!bridge.fire_next());
    }

    #[test]
    fn reentrant_flush_sync_is_noop() {
        let (sched, _bridge) = manual();
        let inner = Rc::new(Cell::new(None));
        let (s, i) = (sched.clone(), inner.clone());
        sched
            .enqueue(TaskFn::rc("nested", move || {
                i.set(Some(s.flush_sync().is_none()));
                Ok(())
            }))
            .unwrap();

        sched.flush_sync();
        assert_eq!(inner.get(), Some(true));
        assert_eq!(sched.completed_batches(), 1);
    }

    #[test]
    fn flush_sync_leaves_pending_dispatch_harmless() {
        let (sched, bridge) = manual();
        let log = log();
        sched.on_after_flush(rec(&log, "post")).unwrap();
        sched.enqueue(rec(&log, "t")).unwrap();

        sched.flush_sync();
        assert_eq!(sched.state(), SchedulerState::Idle);
        assert_eq!(*log.borrow(), ["t", "post"]);

        // The earlier deferred request still fires and runs an empty batch.
        bridge.fire_all();
        assert_eq!(*log.borrow(), ["t", "post", "post"]);
        assert_eq!(sched.completed_batches(), 2);
    }

    #[test]
    fn unregister_removes_exactly_one_callback() {
        let (sched, _bridge) = manual();
        let log = log();
        let a = sched.on_before_flush(rec(&log, "a")).unwrap();
        let _b = sched.on_before_flush(rec(&log, "b")).unwrap();

        assert!(a.unregister());
        sched.flush_sync();
        assert!(!a.unregister());
        assert_eq!(*log.borrow(), ["b"]);
    }

    #[test]
    fn empty_names_are_rejected() {
        let (sched, bridge) = manual();
        let unnamed: TaskRef = TaskFn::rc("", || Ok(()));
        assert!(matches!(
            sched.enqueue(unnamed.clone()),
            Err(SchedulerError::InvalidArgument { .. })
        ));
        assert!(sched.on_after_flush(unnamed).is_err());
        assert_eq!(bridge.requests.get(), 0);
    }

    #[test]
    fn closed_bridge_resets_to_idle() {
        let sched = Scheduler::with_bridge(Config::default(), ClosedBridge);
        let mut rx = sched.subscribe();
        let log = log();

        sched.enqueue(rec(&log, "t")).unwrap();
        assert_eq!(sched.state(), SchedulerState::Idle);
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::DispatchFailed);

        // The task stays pending; a synchronous flush still runs it.
        sched.flush_sync();
        assert_eq!(*log.borrow(), ["t"]);
    }

    #[test]
    fn unwinding_task_still_runs_post_callbacks() {
        let cfg = Config {
            catch_panics: false,
            ..Config::default()
        };
        let bridge = ManualBridge::default();
        let sched = Scheduler::with_bridge(cfg, bridge.clone());
        let log = log();
        sched.on_after_flush(rec(&log, "post")).unwrap();
        sched.enqueue(TaskFn::rc("panics", || panic!("boom"))).unwrap();
        sched.enqueue(rec(&log, "never")).unwrap();

        let s = sched.clone();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| s.flush_sync()));
        assert!(res.is_err());
        assert_eq!(*log.borrow(), ["post"]);
        assert_eq!(sched.state(), SchedulerState::Idle);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn unwinding_post_callback_still_returns_to_idle() {
        let cfg = Config {
            catch_panics: false,
            ..Config::default()
        };
        let sched = Scheduler::with_bridge(cfg, ManualBridge::default());
        let log = log();
        let boom = sched
            .on_after_flush(TaskFn::rc("post-panics", || panic!("late")))
            .unwrap();
        sched.enqueue(rec(&log, "t")).unwrap();

        let s = sched.clone();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| s.flush_sync()));
        assert!(res.is_err());
        assert_eq!(sched.state(), SchedulerState::Idle);
        assert_eq!(sched.completed_batches(), 1);

        assert!(boom.unregister());
        sched.enqueue(rec(&log, "later")).unwrap();
        let report = sched.flush_sync().expect("a batch must be able to start");
        assert_eq!((report.batch, report.ran), (2, 1));
        assert_eq!(*log.borrow(), ["t", "later"]);
    }

    #[test]
    fn enqueue_during_batch_is_not_reported_as_coalesced() {
        let (sched, bridge) = manual();
        let mut rx = sched.subscribe();
        let log = log();
        let late = rec(&log, "late");

        let s = sched.clone();
        sched
            .enqueue(TaskFn::rc("spawner", move || {
                s.enqueue(late.clone())?;
                Ok(())
            }))
            .unwrap();
        assert!(bridge.fire_next());

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|ev| ev.kind)
            .collect();
        assert_eq!(
            kinds,
            [
                EventKind::DispatchRequested,
                EventKind::BatchStarting,
                EventKind::BatchFinished,
                EventKind::DispatchRequested,
            ]
        );
    }

    #[test]
    fn coalesced_request_is_reported_while_pending() {
        let (sched, _bridge) = manual();
        let mut rx = sched.subscribe();
        sched.flush();
        sched.flush();

        assert_eq!(rx.try_recv().unwrap().kind, EventKind::DispatchRequested);
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::DispatchCoalesced);
    }

    #[test]
    fn weak_handle_does_not_keep_scheduler_alive() {
        let (sched, _bridge) = manual();
        let seen = Rc::new(Cell::new(0));
        let (weak, sn) = (sched.downgrade(), seen.clone());
        sched
            .on_after_flush(TaskFn::rc("count", move || {
                if let Some(s) = weak.upgrade() {
                    sn.set(s.completed_batches() + 1);
                }
                Ok(())
            }))
            .unwrap();
        sched.flush_sync();
        assert_eq!(seen.get(), 1);

        let weak = sched.downgrade();
        assert!(weak.upgrade().is_some());
        drop(sched);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn completion_handle_is_stable() {
        let sched = Scheduler::with_bridge(Config::default(), SettledBridge::new());
        let other = sched.clone();
        assert!(sched.completion().same_as(other.completion()));
        assert_eq!(sched.bridge_strategy(), "settled");
    }
}
