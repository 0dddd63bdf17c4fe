//! # Example: custom_subscriber
//!
//! Attaches event subscribers to a scheduler.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for batch metrics.
//! - Combine it with the built-in [`LogWriter`] and a `tracing` subscriber.
//!
//! ## Flow
//! ```text
//! Scheduler ──► Bus.publish(DispatchRequested / BatchStarting / TaskFailed / BatchFinished)
//!     └─► subscriber_listener
//!           └─► SubscriberSet.emit() ──► ConsoleSubscriber, LogWriter
//! ```
//!
//! ## Run
//! Requires the `logging` feature to export [`LogWriter`].
//! ```bash
//! RUST_LOG=debug cargo run --example custom_subscriber --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use turnbatch::{Config, Event, EventKind, LogWriter, Scheduler, Subscribe, TaskError, TaskFn};

/// Prints batch totals and failures.
struct ConsoleSubscriber;

#[async_trait::async_trait]
impl Subscribe for ConsoleSubscriber {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::BatchFinished => {
                println!(
                    "[sub] batch {} finished: ran={} failed={}",
                    ev.batch.unwrap_or(0),
                    ev.ran.unwrap_or(0),
                    ev.failed.unwrap_or(0)
                );
            }
            EventKind::TaskFailed | EventKind::TaskPanicked => {
                println!(
                    "[sub] task={} reason={}",
                    ev.task.as_deref().unwrap_or("<unknown>"),
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tokio::task::LocalSet::new()
        .run_until(async {
            let subs: Vec<Arc<dyn Subscribe>> =
                vec![Arc::new(ConsoleSubscriber), Arc::new(LogWriter::new())];
            let sched = Scheduler::builder(Config::default().named("observed"))
                .with_subscribers(subs)
                .build();

            sched.enqueue(TaskFn::rc("index", || Ok(())))?;
            sched.enqueue(TaskFn::rc("upload", || Err(TaskError::fail("timeout"))))?;
            sched.completion().settled().await;

            // Subscribers run on their own workers.
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, Box<dyn std::error::Error>>(())
        })
        .await
}
