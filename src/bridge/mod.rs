//! # Deferred execution bridge.
//!
//! The scheduler never runs a deferred batch by itself: it hands a one-shot
//! callback to a [`Defer`] implementation, which runs it once, after the current
//! synchronous code, on the host runtime's next turn.
//!
//! ## Strategies
//! | Strategy   | Type              | Turn primitive                                             |
//! |------------|-------------------|------------------------------------------------------------|
//! | `tokio`    | [`TokioBridge`]   | `tokio::task::spawn_local` (inside a `LocalSet`)           |
//! | `settled`  | [`SettledBridge`] | `future::ready(())` continuation on a `futures` `LocalPool` |
//!
//! [`detect`] picks one once, when the scheduler is built. A scheduler never mixes
//! strategies.

mod native;
mod settled;

pub use native::TokioBridge;
pub use settled::SettledBridge;

use crate::error::DeferError;

/// One-shot callback handed to a bridge.
pub type DeferredFn = Box<dyn FnOnce()>;

/// A "run once at the next turn" primitive.
pub trait Defer: 'static {
    /// Schedules `callback` to run exactly once after the current synchronous code.
    ///
    /// Must not run `callback` inline.
    fn defer(&self, callback: DeferredFn) -> Result<(), DeferError>;

    /// Short strategy name for logs.
    fn strategy(&self) -> &'static str;

    /// Drives the executor behind the bridge if the bridge owns it.
    ///
    /// Returns `false` when the host runtime drives the bridge instead.
    fn run_until_stalled(&self) -> bool {
        false
    }
}

/// Picks the bridge for a new scheduler.
///
/// - A tokio runtime is current on this thread → [`TokioBridge`]. Deferred batches
///   then run only inside a `tokio::task::LocalSet`; outside one each dispatch fails
///   with [`DeferError::Unavailable`](crate::DeferError::Unavailable) and the
///   scheduler stays idle.
/// - Otherwise → [`SettledBridge`] with its own pool, driven through
///   [`Scheduler::run_until_stalled`](crate::Scheduler::run_until_stalled).
pub fn detect() -> Box<dyn Defer> {
    if tokio::runtime::Handle::try_current().is_ok() {
        Box::new(TokioBridge::new())
    } else {
        Box::new(SettledBridge::new())
    }
}
