//! Scheduler events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the scheduling state machine, the batch
//! executor and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Dispatcher` (dispatch requested/coalesced/failed), `batch::run`
//!   (batch lifecycle, task and callback failures), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: [`Scheduler::subscribe`](crate::Scheduler::subscribe) receivers and the
//!   subscriber listener installed by the builder.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, FlushPhase};
