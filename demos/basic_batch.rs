//! # Example: basic_batch
//!
//! Many producers ask for the same work within one turn; it runs once.
//!
//! Shows how to:
//! - Build a [`Scheduler`] inside a tokio `LocalSet`.
//! - Enqueue the same [`TaskRef`] several times and watch it deduplicate.
//! - Await the batch with [`CompletionSignal::settled`](turnbatch::CompletionSignal::settled).
//!
//! ## Flow
//! ```text
//! producer ×3 ──► enqueue(render)   ─┐
//! producer ×1 ──► enqueue(persist)  ─┴─► one defer() ──► next turn: render, persist
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic_batch
//! ```

use std::cell::Cell;
use std::rc::Rc;

use turnbatch::{Config, Scheduler, TaskFn, TaskRef};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let sched = Scheduler::new(Config::default().named("basic"));
            let renders = Rc::new(Cell::new(0));

            let r = renders.clone();
            let render: TaskRef = TaskFn::rc("render", move || {
                r.set(r.get() + 1);
                println!("[task] render #{}", r.get());
                Ok(())
            });
            let persist: TaskRef = TaskFn::rc("persist", || {
                println!("[task] persist");
                Ok(())
            });

            for producer in 0..3 {
                println!("[producer {producer}] enqueue render");
                sched.enqueue(render.clone())?;
            }
            sched.enqueue(persist)?;
            println!("pending before turn: {}", sched.pending());

            sched.completion().settled().await;
            println!(
                "batches={} renders={}",
                sched.completed_batches(),
                renders.get()
            );
            Ok::<_, Box<dyn std::error::Error>>(())
        })
        .await
}
