//! # LogWriter: event to `tracing` bridge
//!
//! A minimal subscriber that turns incoming [`Event`]s into `tracing` records
//! under the `turnbatch::events` target. Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! DEBUG turnbatch::events: [dispatch-requested]
//! DEBUG turnbatch::events: [batch-starting] batch=3
//!  WARN turnbatch::events: [task-failed] batch=3 task="layout" err="boom"
//! DEBUG turnbatch::events: [batch-finished] batch=3 ran=4 failed=1
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("unknown");
        match e.kind {
            EventKind::DispatchRequested => {
                tracing::debug!(target: "turnbatch::events", "[dispatch-requested]");
            }
            EventKind::DispatchCoalesced => {
                tracing::trace!(target: "turnbatch::events", "[dispatch-coalesced]");
            }
            EventKind::DispatchFailed => {
                tracing::error!(target: "turnbatch::events", "[dispatch-failed] err={reason:?}");
            }
            EventKind::BatchStarting => {
                tracing::debug!(target: "turnbatch::events", "[batch-starting] batch={:?}", e.batch);
            }
            EventKind::BatchFinished => {
                tracing::debug!(
                    target: "turnbatch::events",
                    "[batch-finished] batch={:?} ran={:?} failed={:?}",
                    e.batch, e.ran, e.failed
                );
            }
            EventKind::TaskFailed | EventKind::TaskPanicked => {
                tracing::warn!(
                    target: "turnbatch::events",
                    "[{}] batch={:?} task={task:?} err={reason:?}",
                    failure_tag(e.kind),
                    e.batch
                );
            }
            EventKind::CallbackFailed | EventKind::CallbackPanicked => {
                tracing::warn!(
                    target: "turnbatch::events",
                    "[{}] batch={:?} phase={:?} callback={task:?} err={reason:?}",
                    failure_tag(e.kind),
                    e.batch, e.phase
                );
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(
                    target: "turnbatch::events",
                    "[subscriber-overflow] subscriber={task} reason={reason}"
                );
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(
                    target: "turnbatch::events",
                    "[subscriber-panicked] subscriber={task} info={reason}"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

/// Bracketed tag for task and callback failure records.
fn failure_tag(kind: EventKind) -> &'static str {
    match kind {
        EventKind::TaskPanicked => "task-panicked",
        EventKind::CallbackFailed => "callback-failed",
        EventKind::CallbackPanicked => "callback-panicked",
        _ => "task-failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_tags_follow_the_event_kind() {
        assert_eq!(failure_tag(EventKind::TaskFailed), "task-failed");
        assert_eq!(failure_tag(EventKind::TaskPanicked), "task-panicked");
        assert_eq!(failure_tag(EventKind::CallbackFailed), "callback-failed");
        assert_eq!(failure_tag(EventKind::CallbackPanicked), "callback-panicked");
    }
}
