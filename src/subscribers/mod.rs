//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] fan-out
//! used to deliver scheduler [`Event`](crate::Event)s to async consumers
//! (metrics, alerting, audit) without ever blocking a batch.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Dispatcher / batch::run ── publish(Event) ──► Bus ──► subscriber listener
//!                                                            │
//!                                                            └──► SubscriberSet::emit
//!                                                                   ├──► [queue] ─► worker ─► sub1.on_event()
//!                                                                   └──► [queue] ─► worker ─► subN.on_event()
//! ```
//!
//! Subscribers are `Send + Sync` and run on the tokio runtime, away from the
//! single-threaded scheduler; they only ever see cloned events.
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use turnbatch::{Subscribe, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.is_failure() {
//!             // increment failure counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
