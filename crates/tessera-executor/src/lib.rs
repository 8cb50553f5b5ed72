//! Tessera Executor
//!
//! Streaming execution of fragment sequences with bounded concurrency,
//! barriers, a strictly serial mode, result-driven expansion and a run-once
//! shutdown hook.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Sequencer (decision task)                  │
//! │  - reads a stack of input streams one fragment at a time    │
//! │  - owns SchedulerState (pending, started, last barrier)     │
//! │  - batch / barrier / sequential / skip-all policy           │
//! │  - waits on fragments with continuations and pushes their   │
//! │    output on the stack before reading further input         │
//! └─────────────────────────────────────────────────────────────┘
//!                               │ started fragments (bounded)
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Emitter                            │
//! │  - awaits each result in output order                       │
//! │  - stops on fatal barrier failures and cancellation         │
//! └─────────────────────────────────────────────────────────────┘
//!                               │ FragmentStream
//!                               ▼
//!                 consumer → shutdown hook (once)
//!
//! Execution units run on tokio tasks, gated by their dependencies and
//! by the WorkerPool semaphore.
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use futures::StreamExt;
//! use tessera_executor::{ExecutionContext, Scheduler};
//!
//! let ctx = ExecutionContext::builder(config)
//!   .on_shutdown(|| println!("done"))
//!   .build()?;
//! let mut output = Scheduler::new(ctx).run(futures::stream::iter(fragments));
//! while let Some(fragment) = output.next().await {
//!   let fragment = fragment?;
//!   println!("{}: {:?}", fragment.description(), fragment.result());
//! }
//! ```

mod context;
mod error;
mod events;
mod expander;
mod scheduler;
mod sequencer;
mod shutdown;
mod state;
mod stream;
mod unit;

pub use context::{ContextBuilder, ExecutionContext, WorkerPool};
pub use error::SchedulerError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use scheduler::Scheduler;
pub use sequencer::Sequencer;
pub use shutdown::ShutdownHook;
pub use state::SchedulerState;
pub use stream::{FragmentStream, RunSummary};
pub use unit::{run_inline, skip, start};
