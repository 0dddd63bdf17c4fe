//! Fallback strategy: continuation of an already-settled future.
//!
//! `future::ready(())` is complete from the start; mapping the callback onto it
//! and spawning the result on a [`LocalPool`] runs the callback the next time the
//! pool is driven, never inline.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use futures::executor::{LocalPool, LocalSpawner};
use futures::future::{self, FutureExt};
use futures::task::LocalSpawnExt;

use crate::bridge::{Defer, DeferredFn};
use crate::error::DeferError;

/// Bridge backed by a `futures` [`LocalPool`].
///
/// Either owns its pool ([`SettledBridge::new`], driven with
/// [`run_until_stalled`](SettledBridge::run_until_stalled)) or feeds a pool owned by
/// the host ([`SettledBridge::with_spawner`]). Clones share the same pool.
#[derive(Clone)]
pub struct SettledBridge {
    spawner: LocalSpawner,
    pool: Option<Rc<RefCell<LocalPool>>>,
}

impl SettledBridge {
    /// Creates a bridge with its own pool.
    #[must_use]
    pub fn new() -> Self {
        let pool = LocalPool::new();
        Self {
            spawner: pool.spawner(),
            pool: Some(Rc::new(RefCell::new(pool))),
        }
    }

    /// Creates a bridge that spawns onto a pool owned by the caller.
    ///
    /// If that pool is dropped, [`Defer::defer`] fails with [`DeferError::Closed`].
    #[must_use]
    pub fn with_spawner(spawner: LocalSpawner) -> Self {
        Self {
            spawner,
            pool: None,
        }
    }

    /// Runs deferred callbacks until none can make progress.
    ///
    /// Returns `false` without doing anything when the pool is external or is already
    /// being driven further up the stack.
    pub fn run_until_stalled(&self) -> bool {
        let Some(pool) = &self.pool else {
            return false;
        };
        match pool.try_borrow_mut() {
            Ok(mut pool) => {
                pool.run_until_stalled();
                true
            }
            Err(_) => false,
        }
    }
}

impl Default for SettledBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SettledBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettledBridge")
            .field("owns_pool", &self.pool.is_some())
            .finish()
    }
}

impl Defer for SettledBridge {
    fn defer(&self, callback: DeferredFn) -> Result<(), DeferError> {
        let continuation = future::ready(()).map(move |()| callback());
        self.spawner
            .spawn_local(continuation)
            .map_err(|_| DeferError::Closed {
                strategy: self.strategy(),
            })
    }

    fn strategy(&self) -> &'static str {
        "settled"
    }

    fn run_until_stalled(&self) -> bool {
        SettledBridge::run_until_stalled(self)
    }
}
