//! # Example: settled_pool
//!
//! Runs the scheduler without tokio, on a `futures` local pool.
//!
//! Shows how to:
//! - Pick the [`SettledBridge`] explicitly.
//! - Drive batches with `run_until_stalled`.
//! - Enqueue follow-up work from inside a task; it lands in the next batch.
//! - Give a lifecycle callback a [`WeakScheduler`](turnbatch::WeakScheduler).
//!
//! ## Run
//! ```bash
//! cargo run --example settled_pool
//! ```

use turnbatch::{Config, Scheduler, SettledBridge, TaskFn, TaskRef};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sched = Scheduler::with_bridge(Config::default().named("pool"), SettledBridge::new());
    println!("strategy: {}", sched.bridge_strategy());

    // Callbacks live as long as the scheduler: hold it weakly.
    let weak = sched.downgrade();
    sched.on_after_flush(TaskFn::rc("report", move || {
        if let Some(s) = weak.upgrade() {
            println!("[hook] batch {} done", s.completed_batches() + 1);
        }
        Ok(())
    }))?;

    let cleanup: TaskRef = TaskFn::rc("cleanup", || {
        println!("[task] cleanup");
        Ok(())
    });
    let s = sched.clone();
    sched.enqueue(TaskFn::rc("load", move || {
        println!("[task] load, scheduling cleanup");
        s.enqueue(cleanup.clone())?;
        Ok(())
    }))?;

    while sched.run_until_stalled() && sched.pending() > 0 {}
    println!("batches={}", sched.completed_batches());
    Ok(())
}
