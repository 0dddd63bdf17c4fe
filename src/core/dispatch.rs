//! # Scheduling state machine.
//!
//! Owns the dispatch state of one scheduler and decides when a deferred batch is
//! requested from the bridge.
//!
//! ## States
//! ```text
//!            request_dispatch()                 bridge fires
//!   Idle ─────────────────────► DispatchPending ────────────► Flushing ──► Idle
//!    │                                                           ▲          │
//!    └────────────── force_dispatch_now() ───────────────────────┘          │
//!                                                                           ▼
//!                                        registry not empty? ─► request_dispatch()
//! ```
//!
//! ## Rules
//! - `request_dispatch` in `DispatchPending` or `Flushing` is a no-op: any number of
//!   requests before a batch starts produce exactly one batch. Only the
//!   `DispatchPending` case publishes `DispatchCoalesced`.
//! - `force_dispatch_now` in `Flushing` is a no-op (no reentrant batches). It does not
//!   cancel a pending deferred dispatch; that one later runs a possibly empty batch.
//! - The return to `Idle` is unconditional (see `batch::Finalizer`).
//! - Tasks enqueued while `Flushing` cannot request a dispatch themselves; the batch
//!   finalizer requests one once the state is back to `Idle`.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use tokio::sync::watch;

use crate::core::batch::{self, BatchReport};
use crate::core::scheduler::Shared;
use crate::events::{Event, EventKind};

/// Dispatch state of a scheduler. Single source of truth, never exposed publicly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SchedulerState {
    /// No batch pending or running.
    Idle,
    /// A deferred batch was requested from the bridge but has not started.
    DispatchPending,
    /// A batch is executing.
    Flushing,
}

/// State cell plus batch counters.
pub(crate) struct Dispatcher {
    state: Cell<SchedulerState>,
    /// Batches started so far; the current batch number while `Flushing`.
    started: Cell<u64>,
    /// Batches finished so far, observed by [`CompletionSignal`](crate::CompletionSignal).
    finished: watch::Sender<u64>,
}

impl Dispatcher {
    pub(crate) fn new() -> Self {
        let (finished, _rx) = watch::channel(0);
        Self {
            state: Cell::new(SchedulerState::Idle),
            started: Cell::new(0),
            finished,
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> SchedulerState {
        self.state.get()
    }

    /// `Idle → DispatchPending`. Returns `false` if a batch is already pending or running.
    fn arm(&self) -> bool {
        match self.state.get() {
            SchedulerState::Idle => {
                self.state.set(SchedulerState::DispatchPending);
                true
            }
            SchedulerState::DispatchPending | SchedulerState::Flushing => false,
        }
    }

    /// `DispatchPending → Idle` after the bridge refused the callback.
    fn disarm(&self) {
        if self.state.get() == SchedulerState::DispatchPending {
            self.state.set(SchedulerState::Idle);
        }
    }

    /// Enters `Flushing` and returns the new batch number, or `None` if a batch is running.
    pub(crate) fn begin_batch(&self) -> Option<u64> {
        if self.state.get() == SchedulerState::Flushing {
            return None;
        }
        self.state.set(SchedulerState::Flushing);
        let batch = self.started.get() + 1;
        self.started.set(batch);
        Some(batch)
    }

    /// `Flushing → Idle` and publish the finished count.
    pub(crate) fn end_batch(&self) {
        self.state.set(SchedulerState::Idle);
        self.finished.send_modify(|done| *done += 1);
    }

    pub(crate) fn finished_batches(&self) -> u64 {
        *self.finished.borrow()
    }

    /// Finished-batch count that marks the end of the batch pending or running now.
    ///
    /// When idle there is nothing to wait for and the current count is returned.
    pub(crate) fn completion_target(&self) -> u64 {
        let done = self.finished_batches();
        match self.state.get() {
            SchedulerState::Idle => done,
            SchedulerState::DispatchPending | SchedulerState::Flushing => done + 1,
        }
    }

    pub(crate) fn watch_finished(&self) -> watch::Receiver<u64> {
        self.finished.subscribe()
    }
}

/// Requests one deferred batch unless a batch is already pending or running.
pub(crate) fn request_dispatch(shared: &Rc<Shared>) {
    let dispatcher = &shared.dispatcher;
    if !dispatcher.arm() {
        if dispatcher.state() == SchedulerState::Flushing {
            // The batch finalizer requests the follow-up dispatch.
            tracing::trace!(scheduler = %shared.cfg.name, "dispatch deferred to batch end");
            return;
        }
        tracing::trace!(scheduler = %shared.cfg.name, "dispatch coalesced");
        shared.bus.publish(Event::new(EventKind::DispatchCoalesced));
        return;
    }

    let weak = Rc::downgrade(shared);
    match shared.bridge.defer(Box::new(move || run_deferred(weak))) {
        Ok(()) => {
            tracing::debug!(
                scheduler = %shared.cfg.name,
                strategy = shared.bridge.strategy(),
                "dispatch requested"
            );
            shared.bus.publish(Event::new(EventKind::DispatchRequested));
        }
        Err(err) => {
            dispatcher.disarm();
            tracing::error!(
                scheduler = %shared.cfg.name,
                error = %err,
                "bridge refused deferred batch; scheduler back to idle"
            );
            shared
                .bus
                .publish(Event::new(EventKind::DispatchFailed).with_reason(err.to_string()));
        }
    }
}

/// Runs a batch synchronously unless one is already running.
pub(crate) fn force_dispatch_now(shared: &Rc<Shared>) -> Option<BatchReport> {
    let Some(batch) = shared.dispatcher.begin_batch() else {
        tracing::trace!(scheduler = %shared.cfg.name, "flush_sync ignored: batch in progress");
        return None;
    };
    Some(batch::run(shared, batch))
}

/// Bridge entry point. The scheduler may be gone by the time the turn arrives.
fn run_deferred(weak: Weak<Shared>) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    match shared.dispatcher.begin_batch() {
        Some(batch) => {
            batch::run(&shared, batch);
        }
        None => {
            // Driven from inside a running batch; its finalizer re-requests a dispatch
            // if anything is left pending.
            tracing::trace!(scheduler = %shared.cfg.name, "deferred batch skipped: batch in progress");
        }
    }
}
