//! # Scheduler builder.
//!
//! ```text
//! SchedulerBuilder::new(cfg)
//!     .with_bridge(..)        optional; default: bridge::detect()
//!     .with_subscribers(..)   optional; needs a tokio runtime at build()
//!     .build() ──► Scheduler
//! ```

use std::rc::Rc;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;

use crate::bridge::{self, Defer};
use crate::core::config::Config;
use crate::core::scheduler::{Scheduler, Shared};
use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`Scheduler`] with optional features.
pub struct SchedulerBuilder {
    cfg: Config,
    bridge: Option<Box<dyn Defer>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            bridge: None,
            subscribers: Vec::new(),
        }
    }

    /// Uses `bridge` instead of the detected one.
    pub fn with_bridge(mut self, bridge: impl Defer) -> Self {
        self.bridge = Some(Box::new(bridge));
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive scheduler events (batch lifecycle, failures, etc.)
    /// through dedicated workers with bounded queues. Building with subscribers
    /// requires a running tokio runtime.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the scheduler. The bridge strategy is fixed from here on.
    ///
    /// # Panics
    /// Panics if subscribers were configured and no tokio runtime is current.
    pub fn build(self) -> Scheduler {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let bridge = self.bridge.unwrap_or_else(bridge::detect);

        let stop_subscribers = if self.subscribers.is_empty() {
            None
        } else {
            let (stop, stopped) = oneshot::channel();
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            subscriber_listener(&bus, set, stopped);
            Some(stop)
        };

        tracing::debug!(
            scheduler = %self.cfg.name,
            strategy = bridge.strategy(),
            "scheduler created"
        );
        Scheduler::from_shared(Rc::new(Shared::new(
            self.cfg,
            bus,
            bridge,
            stop_subscribers,
        )))
    }
}

/// Forwards bus events to the subscriber set until the scheduler is dropped.
///
/// Subscriber workers hold bus senders for their own reports, so the bus never
/// closes on its own; the scheduler drops `stopped`'s sender instead. Events already
/// queued on the bus are forwarded before the workers shut down.
fn subscriber_listener(bus: &Bus, set: SubscriberSet, mut stopped: oneshot::Receiver<()>) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = &mut stopped => break,
            }
        }
        tracing::debug!(subscribers = set.len(), "subscriber listener stopped");
        set.shutdown().await;
    });
}
