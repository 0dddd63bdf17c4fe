//! # Events emitted by the scheduler.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Dispatch events**: requests to the deferred-execution bridge (requested, coalesced, failed)
//! - **Batch events**: batch lifecycle and isolated task/callback failures
//! - **Subscriber events**: overflow and panics of async subscribers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, batch
//! number, task name and failure reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use turnbatch::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_batch(7)
//!     .with_task("layout")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("layout"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of scheduler events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Dispatch events ===
    /// A deferred batch was requested from the bridge (`Idle → DispatchPending`).
    DispatchRequested,

    /// A dispatch request arrived while a batch was already pending and was folded into it.
    DispatchCoalesced,

    /// The bridge refused the deferred callback; the scheduler went back to `Idle`.
    ///
    /// Sets:
    /// - `reason`: bridge error
    DispatchFailed,

    // === Batch events ===
    /// A batch is starting.
    ///
    /// Sets:
    /// - `batch`: batch number (1-based, per scheduler)
    BatchStarting,

    /// A batch finished (post-flush callbacks already ran).
    ///
    /// Sets:
    /// - `batch`: batch number
    /// - `ran`: tasks invoked
    /// - `failed`: tasks that returned an error or panicked
    BatchFinished,

    /// A task returned an error.
    ///
    /// Sets:
    /// - `batch`, `task`, `reason`
    TaskFailed,

    /// A task panicked and the panic was caught.
    ///
    /// Sets:
    /// - `batch`, `task`, `reason` (panic info)
    TaskPanicked,

    /// A lifecycle callback returned an error.
    ///
    /// Sets:
    /// - `batch`, `task` (callback name), `phase`, `reason`
    CallbackFailed,

    /// A lifecycle callback panicked and the panic was caught.
    ///
    /// Sets:
    /// - `batch`, `task` (callback name), `phase`, `reason`
    CallbackPanicked,
}

/// Which side of a batch a lifecycle callback runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPhase {
    /// Before any task of the batch.
    Before,
    /// After every task of the batch.
    After,
}

impl FlushPhase {
    /// Short label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            FlushPhase::Before => "before_flush",
            FlushPhase::After => "after_flush",
        }
    }
}

impl fmt::Display for FlushPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduler event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Batch number (1-based, per scheduler).
    pub batch: Option<u64>,
    /// Name of the task, callback or subscriber, if applicable.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Callback phase for callback events.
    pub phase: Option<FlushPhase>,
    /// Tasks invoked by a finished batch.
    pub ran: Option<u32>,
    /// Tasks that failed in a finished batch.
    pub failed: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            batch: None,
            task: None,
            reason: None,
            phase: None,
            ran: None,
            failed: None,
        }
    }

    /// Attaches a batch number.
    #[inline]
    pub fn with_batch(mut self, batch: u64) -> Self {
        self.batch = Some(batch);
        self
    }

    /// Attaches a task (or callback/subscriber) name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a callback phase.
    #[inline]
    pub fn with_phase(mut self, phase: FlushPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attaches batch totals (saturating at `u32::MAX`).
    #[inline]
    pub fn with_totals(mut self, ran: usize, failed: usize) -> Self {
        self.ran = Some(u32::try_from(ran).unwrap_or(u32::MAX));
        self.failed = Some(u32::try_from(failed).unwrap_or(u32::MAX));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// True for events that report an isolated failure.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TaskFailed
                | EventKind::TaskPanicked
                | EventKind::CallbackFailed
                | EventKind::CallbackPanicked
                | EventKind::DispatchFailed
                | EventKind::SubscriberPanicked
        )
    }
}
