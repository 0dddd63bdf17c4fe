//! # Example: lifecycle_hooks
//!
//! Brackets every batch with before/after callbacks and shows failure isolation.
//!
//! Shows how to:
//! - Register callbacks with `on_before_flush` / `on_after_flush`.
//! - Keep a batch running when a task fails or panics.
//! - Unregister a callback through its [`RegistrationHandle`](turnbatch::RegistrationHandle).
//!
//! ## Flow
//! ```text
//! batch 1: begin ─► ok, fails, panics, ok ─► end
//! batch 2: begin ─► again                  (end unregistered)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example lifecycle_hooks
//! ```

use turnbatch::{Config, Scheduler, TaskError, TaskFn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tokio::task::LocalSet::new()
        .run_until(async {
            let sched = Scheduler::new(Config::default().named("hooks"));

            sched.on_before_flush(TaskFn::rc("begin", || {
                println!("[hook] begin");
                Ok(())
            }))?;
            let end = sched.on_after_flush(TaskFn::rc("end", || {
                println!("[hook] end");
                Ok(())
            }))?;

            sched.enqueue(TaskFn::rc("ok", || {
                println!("[task] ok");
                Ok(())
            }))?;
            sched.enqueue(TaskFn::rc("fails", || Err(TaskError::fail("disk full"))))?;
            sched.enqueue(TaskFn::rc("panics", || panic!("bad state")))?;
            sched.enqueue(TaskFn::rc("still-runs", || {
                println!("[task] still-runs");
                Ok(())
            }))?;
            sched.completion().settled().await;

            end.unregister();
            sched.enqueue(TaskFn::rc("again", || {
                println!("[task] again");
                Ok(())
            }))?;
            sched.completion().settled().await;

            println!("batches={}", sched.completed_batches());
            Ok::<_, Box<dyn std::error::Error>>(())
        })
        .await
}
