//! # turnbatch
//!
//! **turnbatch** coalesces many independently-triggered deferred work items into a
//! single batched pass that runs at the next turn of a cooperative,
//! single-threaded runtime: "do X soon, but only once per turn".
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producer A      producer B      producer C
//!       │ enqueue(t1)   │ enqueue(t1)   │ enqueue(t2)
//!       ▼               ▼               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler                                                        │
//! │  - TaskRegistry (dedup by identity, insertion order)              │
//! │  - before / after CallbackRegistry                                │
//! │  - Dispatcher: Idle → DispatchPending → Flushing → Idle           │
//! │  - Bus (broadcast events)                                         │
//! └──────┬──────────────────────────────────────────────────┬─────────┘
//!        │ at most one defer() per pending batch            │ publish
//!        ▼                                                  ▼
//! ┌──────────────────────────┐                  ┌───────────────────────┐
//! │ Defer (bridge)           │                  │ Bus ──► SubscriberSet │
//! │  - TokioBridge           │                  │  (optional, async)    │
//! │  - SettledBridge         │                  └───────────────────────┘
//! └──────┬───────────────────┘
//!        │ next turn
//!        ▼
//!   batch::run: before-callbacks → t1, t2 → after-callbacks → Idle
//! ```
//!
//! ### Lifecycle of a batch
//! ```text
//! state = Flushing
//!   ├─► publish BatchStarting
//!   ├─► before-flush callbacks     (each isolated)
//!   ├─► snapshot = registry.drain  (tasks enqueued from now on wait for the next batch)
//!   ├─► for task in snapshot       (each isolated: Err / panic → TaskFailed / TaskPanicked)
//!   └─► finalizer (also on unwind)
//!         ├─► after-flush callbacks (each isolated)
//!         ├─► state = Idle, CompletionSignal advances, publish BatchFinished
//!         └─► registry not empty → request a new dispatch
//! ```
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                            |
//! |-------------------|-------------------------------------------------------------|-----------------------------------------------|
//! | **Scheduling**    | Enqueue, deferred and synchronous flush, lifecycle hooks.   | [`Scheduler`], [`WeakScheduler`], [`RegistrationHandle`] |
//! | **Tasks**         | Zero-argument units of work with identity-based dedup.      | [`Task`], [`TaskFn`], [`TaskRef`]             |
//! | **Bridges**       | "Run at next turn" primitives of the host runtime.          | [`Defer`], [`TokioBridge`], [`SettledBridge`] |
//! | **Completion**    | Await the batch pending or running right now.               | [`CompletionSignal`]                          |
//! | **Events**        | Structured reports of dispatches, batches and failures.     | [`Event`], [`EventKind`], [`Subscribe`]       |
//! | **Errors**        | Typed usage, execution and bridge errors.                   | [`SchedulerError`], [`TaskError`], [`DeferError`] |
//! | **Configuration** | Log label, bus capacity, panic isolation.                   | [`Config`]                                    |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber that renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use turnbatch::{Config, Scheduler, TaskFn, TaskRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let local = tokio::task::LocalSet::new();
//!     local.run_until(async {
//!         let sched = Scheduler::new(Config::default());
//!         let seen = Rc::new(RefCell::new(Vec::new()));
//!
//!         let s = seen.clone();
//!         sched.on_before_flush(TaskFn::rc("before", move || { s.borrow_mut().push("P"); Ok(()) }))?;
//!         let s = seen.clone();
//!         sched.on_after_flush(TaskFn::rc("after", move || { s.borrow_mut().push("Q"); Ok(()) }))?;
//!
//!         let s = seen.clone();
//!         let task: TaskRef = TaskFn::rc("task", move || { s.borrow_mut().push("T"); Ok(()) });
//!         sched.enqueue(task.clone())?;
//!         sched.enqueue(task)?; // deduplicated
//!
//!         sched.completion().settled().await;
//!         assert_eq!(*seen.borrow(), ["P", "T", "Q"]);
//!         Ok::<_, Box<dyn std::error::Error>>(())
//!     }).await
//! }
//! ```
pub mod bridge;
mod core;
mod error;
mod events;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use crate::bridge::{Defer, DeferredFn, SettledBridge, TokioBridge};
pub use crate::core::{
    BatchReport, CompletionSignal, Config, RegistrationHandle, Scheduler, SchedulerBuilder,
    WeakScheduler,
};
pub use crate::error::{DeferError, SchedulerError, TaskError};
pub use crate::events::{Event, EventKind, FlushPhase};
pub use crate::subscribers::{Subscribe, SubscriberSet};
pub use crate::tasks::{Task, TaskFn, TaskRef};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use crate::subscribers::LogWriter;
