//! Scheduler core: registries, state machine, batch execution.
//!
//! The public API of this module is [`Scheduler`], its [`SchedulerBuilder`],
//! [`WeakScheduler`], [`Config`], [`CompletionSignal`], [`RegistrationHandle`] and [`BatchReport`].
//!
//! Internal modules:
//! - [`registry`]: deduplicated, insertion-ordered task set;
//! - [`hooks`]: pre/post-flush callback registries and registration handles;
//! - [`dispatch`]: the `Idle → DispatchPending → Flushing` state machine;
//! - [`batch`]: runs one batch with callback bracketing and failure isolation;
//! - [`completion`]: awaitable batch-completion handle;
//! - [`scheduler`] / [`builder`]: public facade.

mod batch;
mod builder;
mod completion;
mod config;
mod dispatch;
mod hooks;
mod registry;
mod scheduler;

pub use batch::BatchReport;
pub use builder::SchedulerBuilder;
pub use completion::CompletionSignal;
pub use config::Config;
pub use hooks::RegistrationHandle;
pub use scheduler::{Scheduler, WeakScheduler};
