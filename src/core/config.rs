//! # Scheduler configuration.
//!
//! Provides [`Config`] centralized settings for a [`Scheduler`](crate::Scheduler).
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1 by the bus

use std::borrow::Cow;

/// Configuration for one scheduler instance.
///
/// ## Field semantics
/// - `name`: label attached to every log record of this scheduler
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `catch_panics`: isolate panics of tasks and lifecycle callbacks
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Label used in `tracing` records (`scheduler = ...`).
    pub name: Cow<'static, str>,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events observe
    /// `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Whether panics raised by tasks and lifecycle callbacks are caught.
    ///
    /// - `true`: a panic is converted into [`TaskError::Panicked`](crate::TaskError::Panicked),
    ///   reported, and the batch continues with the next unit.
    /// - `false`: the panic unwinds out of the batch. Post-flush callbacks still run
    ///   and the scheduler still returns to idle before the unwind reaches the caller.
    pub catch_panics: bool,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a copy of this config with a different log label.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `name = "turnbatch"`
    /// - `bus_capacity = 1024`
    /// - `catch_panics = true`
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("turnbatch"),
            bus_capacity: 1024,
            catch_panics: true,
        }
    }
}
