//! # Completion signal.
//!
//! [`CompletionSignal`] lets code outside the scheduler wait for the batch that is
//! pending or running right now. One signal is created per scheduler and handed out
//! by [`Scheduler::completion`](crate::Scheduler::completion) for the scheduler's
//! whole lifetime.
//!
//! ## Semantics
//! - [`settled`](CompletionSignal::settled) captures its target when it is called:
//!   the end of the batch that is pending or running at that moment.
//! - If the scheduler is idle, the returned future is ready immediately.
//! - Tasks enqueued after the call may land in a later batch and are not covered.
//! - If the scheduler is dropped first, the future resolves.
//!
//! ## Example
//! ```rust
//! use turnbatch::{Config, Scheduler, SettledBridge, TaskFn};
//!
//! let bridge = SettledBridge::new();
//! let sched = Scheduler::with_bridge(Config::default(), bridge.clone());
//! sched.enqueue(TaskFn::rc("work", || Ok(()))).unwrap();
//!
//! let done = sched.completion().settled();
//! bridge.run_until_stalled();
//! futures::executor::block_on(done);
//! assert_eq!(sched.completed_batches(), 1);
//! ```

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use tokio::sync::watch;

use crate::core::dispatch::Dispatcher;

/// Awaitable handle correlated with batch completion.
#[derive(Clone)]
pub struct CompletionSignal {
    dispatcher: Rc<Dispatcher>,
    finished: watch::Receiver<u64>,
}

impl CompletionSignal {
    pub(crate) fn new(dispatcher: Rc<Dispatcher>) -> Self {
        let finished = dispatcher.watch_finished();
        Self {
            dispatcher,
            finished,
        }
    }

    /// Returns a future that resolves once the batch pending or running at the time
    /// of this call has finished (post-flush callbacks included).
    pub fn settled(&self) -> impl Future<Output = ()> + 'static {
        let target = self.dispatcher.completion_target();
        let mut rx = self.finished.clone();
        async move {
            // Err means the scheduler is gone; nothing left to wait for.
            let _ = rx.wait_for(|done| *done >= target).await;
        }
    }

    /// Number of batches finished so far.
    pub fn completed_batches(&self) -> u64 {
        *self.finished.borrow()
    }

    /// True if both handles belong to the same scheduler.
    pub fn same_as(&self, other: &CompletionSignal) -> bool {
        Rc::ptr_eq(&self.dispatcher, &other.dispatcher)
    }
}

impl fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("completed_batches", &self.completed_batches())
            .finish()
    }
}
