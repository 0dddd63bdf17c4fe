//! # Batch executor: run one flush pass.
//!
//! Executes one batch once the state machine has entered `Flushing`, reporting
//! every isolated failure through `tracing` and the [`Bus`](crate::events::Bus).
//!
//! ## Flow
//! ```text
//! run(batch)
//!   ├─► publish BatchStarting
//!   ├─► before-flush callbacks   (snapshot, isolated)
//!   ├─► drain_snapshot()         (registry empty from here on)
//!   ├─► for task in snapshot:    invoke → Err/panic → report TaskFailed/TaskPanicked
//!   └─► Finalizer::drop          (runs even while unwinding)
//!         ├─► after-flush callbacks (snapshot, isolated)
//!         └─► Settle::drop       (runs even if an after-flush callback unwinds)
//!               ├─► state → Idle, finished += 1
//!               ├─► publish BatchFinished
//!               └─► registry not empty → request_dispatch()
//! ```
//!
//! ## Rules
//! - Pre-callbacks precede all tasks, which precede all post-callbacks.
//! - A failing task or callback never aborts the batch.
//! - Tasks enqueued during the batch are not part of its snapshot.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::core::dispatch::request_dispatch;
use crate::core::hooks::invoke_all;
use crate::core::scheduler::Shared;
use crate::error::{panic_info, TaskError};
use crate::events::{Event, EventKind, FlushPhase};
use crate::tasks::{Task, TaskRef};

/// Outcome of one batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Batch number (1-based, per scheduler).
    pub batch: u64,
    /// Tasks invoked.
    pub ran: usize,
    /// Tasks that returned an error or panicked.
    pub failed: usize,
}

/// Invokes one task or callback, converting a panic into [`TaskError::Panicked`].
///
/// With `catch_panics = false` the panic propagates, unless the thread is already
/// unwinding: a second panic would abort the process.
pub(crate) fn invoke(task: &dyn Task, catch_panics: bool) -> Result<(), TaskError> {
    if !catch_panics && !std::thread::panicking() {
        return task.run();
    }
    match catch_unwind(AssertUnwindSafe(|| task.run())) {
        Ok(res) => res,
        Err(payload) => Err(TaskError::Panicked {
            info: panic_info(&*payload),
        }),
    }
}

/// Runs batch number `batch`. The caller has already moved the state to `Flushing`.
pub(crate) fn run(shared: &Rc<Shared>, batch: u64) -> BatchReport {
    let span = tracing::debug_span!("batch", scheduler = %shared.cfg.name, batch);
    let _enter = span.enter();

    let mut guard = Finalizer {
        shared,
        batch,
        ran: 0,
        failed: 0,
    };

    tracing::debug!(pending = shared.tasks.borrow().len(), "batch starting");
    shared
        .bus
        .publish(Event::new(EventKind::BatchStarting).with_batch(batch));

    run_callbacks(shared, batch, FlushPhase::Before);

    let snapshot = shared.tasks.borrow_mut().drain_snapshot();
    for task in &snapshot {
        guard.ran += 1;
        if let Err(err) = invoke(task.as_ref(), shared.cfg.catch_panics) {
            guard.failed += 1;
            report_task_failure(shared, batch, task, &err);
        }
    }

    let report = BatchReport {
        batch,
        ran: guard.ran,
        failed: guard.failed,
    };
    drop(guard);
    report
}

/// Runs the after-flush half of a batch and returns the scheduler to idle, whether
/// the task loop completed or unwound.
struct Finalizer<'a> {
    shared: &'a Rc<Shared>,
    batch: u64,
    ran: usize,
    failed: usize,
}

impl Drop for Finalizer<'_> {
    fn drop(&mut self) {
        // Armed first: also runs if an after-flush callback unwinds.
        let _settle = Settle {
            shared: self.shared,
            batch: self.batch,
            ran: self.ran,
            failed: self.failed,
        };
        run_callbacks(self.shared, self.batch, FlushPhase::After);
    }
}

/// Returns the scheduler to `Idle` once the after-flush callbacks are done.
struct Settle<'a> {
    shared: &'a Rc<Shared>,
    batch: u64,
    ran: usize,
    failed: usize,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        let shared = self.shared;
        shared.dispatcher.end_batch();
        tracing::debug!(ran = self.ran, failed = self.failed, "batch finished");
        shared.bus.publish(
            Event::new(EventKind::BatchFinished)
                .with_batch(self.batch)
                .with_totals(self.ran, self.failed),
        );

        // Tasks enqueued during the batch found the state `Flushing` and could not
        // request a dispatch on their own.
        if !shared.tasks.borrow().is_empty() {
            request_dispatch(shared);
        }
    }
}

fn run_callbacks(shared: &Shared, batch: u64, phase: FlushPhase) {
    let registry = match phase {
        FlushPhase::Before => &shared.before,
        FlushPhase::After => &shared.after,
    };
    invoke_all(registry, shared.cfg.catch_panics, |cb, err| {
        report_callback_failure(shared, batch, phase, cb, &err);
    });
}

/// Logs and publishes `TaskFailed` / `TaskPanicked`.
fn report_task_failure(shared: &Shared, batch: u64, task: &TaskRef, err: &TaskError) {
    tracing::warn!(task = task.name(), error = %err, kind = err.as_label(), "task failed");
    let kind = if err.is_panic() {
        EventKind::TaskPanicked
    } else {
        EventKind::TaskFailed
    };
    shared.bus.publish(
        Event::new(kind)
            .with_batch(batch)
            .with_task(task.name())
            .with_reason(detail(err)),
    );
}

/// Logs and publishes `CallbackFailed` / `CallbackPanicked`.
fn report_callback_failure(
    shared: &Shared,
    batch: u64,
    phase: FlushPhase,
    cb: &TaskRef,
    err: &TaskError,
) {
    tracing::warn!(
        callback = cb.name(),
        %phase,
        error = %err,
        kind = err.as_label(),
        "lifecycle callback failed"
    );
    let kind = if err.is_panic() {
        EventKind::CallbackPanicked
    } else {
        EventKind::CallbackFailed
    };
    shared.bus.publish(
        Event::new(kind)
            .with_batch(batch)
            .with_task(cb.name())
            .with_phase(phase)
            .with_reason(detail(err)),
    );
}

fn detail(err: &TaskError) -> String {
    match err {
        TaskError::Fail { error } => error.clone(),
        TaskError::Panicked { info } => info.clone(),
    }
}
