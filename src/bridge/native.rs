//! Native strategy: tokio's local task queue.
//!
//! `spawn_local` queues the callback on the current `LocalSet`; it runs after the
//! task that called [`Defer::defer`] yields, which is the next turn from that task's
//! point of view.
//!
//! tokio has no way to ask whether a `LocalSet` is active, and `spawn_local` panics
//! when none is. The bridge catches that panic and reports
//! [`DeferError::Unavailable`] instead; the panic hook still prints the message.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::bridge::{Defer, DeferredFn};
use crate::error::{panic_info, DeferError};

/// Bridge backed by [`tokio::task::spawn_local`].
///
/// Only usable from inside a `tokio::task::LocalSet`. Elsewhere `defer` returns
/// [`DeferError::Unavailable`] and the scheduler stays idle; a synchronous flush
/// still works.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioBridge;

impl TokioBridge {
    /// Creates the bridge.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Defer for TokioBridge {
    fn defer(&self, callback: DeferredFn) -> Result<(), DeferError> {
        // A second panic while unwinding would abort the process.
        if std::thread::panicking() {
            return Err(DeferError::Unavailable {
                strategy: self.strategy(),
                reason: "thread is unwinding".to_string(),
            });
        }
        let spawned = catch_unwind(AssertUnwindSafe(move || {
            tokio::task::spawn_local(async move { callback() })
        }));
        match spawned {
            // Detached: the batch reports its own outcome.
            Ok(handle) => {
                drop(handle);
                Ok(())
            }
            Err(payload) => Err(DeferError::Unavailable {
                strategy: self.strategy(),
                reason: panic_info(&*payload),
            }),
        }
    }

    fn strategy(&self) -> &'static str {
        "tokio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[tokio::test]
    async fn runs_after_current_code_yields() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let hits = Rc::new(Cell::new(0));
                let h = hits.clone();
                TokioBridge::new()
                    .defer(Box::new(move || h.set(h.get() + 1)))
                    .unwrap();
                assert_eq!(hits.get(), 0);

                tokio::task::yield_now().await;
                assert_eq!(hits.get(), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn outside_local_set_is_unavailable() {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let err = TokioBridge::new()
            .defer(Box::new(move || h.set(h.get() + 1)))
            .unwrap_err();

        assert_eq!(err.as_label(), "defer_unavailable");
        assert!(matches!(err, DeferError::Unavailable { strategy: "tokio", .. }));
        tokio::task::yield_now().await;
        assert_eq!(hits.get(), 0);
    }
}
