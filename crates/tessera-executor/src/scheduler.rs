//! Scheduler entry points.

use futures::{Stream, StreamExt};
use tessera_config::ExecutionConfig;
use tessera_fragment::{Fragment, FragmentSource};
use tokio::sync::mpsc;
use tracing::{Instrument, error, info, instrument, warn};

use crate::context::ExecutionContext;
use crate::error::SchedulerError;
use crate::events::ExecutionEvent;
use crate::expander::{Output, emit, emit_inline};
use crate::stream::{FragmentStream, RunSummary};

/// Runs a fragment stream under one [`ExecutionContext`].
///
/// A scheduler is consumed by a run: the context's shutdown hook fires once
/// that run has drained.
pub struct Scheduler {
  ctx: ExecutionContext,
}

impl Scheduler {
  pub fn new(ctx: ExecutionContext) -> Self {
    Self { ctx }
  }

  /// A scheduler with default collaborators.
  pub fn from_config(config: ExecutionConfig) -> Result<Self, SchedulerError> {
    Ok(Self::new(ExecutionContext::new(config)?))
  }

  pub fn context(&self) -> &ExecutionContext {
    &self.ctx
  }

  /// Start consuming `input` and return the ordered stream of completed
  /// fragments.
  ///
  /// Must be called from within a tokio runtime. Scheduling happens on
  /// spawned tasks; the returned stream only observes it.
  #[instrument(
    name = "scheduler_run",
    skip(self, input),
    fields(run_id = %self.ctx.run_id())
  )]
  pub fn run<S>(self, input: S) -> FragmentStream
  where
    S: Stream<Item = Fragment> + Send + 'static,
  {
    let ctx = self.ctx;
    let config = ctx.config();
    info!(
      skip_all = config.skip_all,
      sequential = config.sequential,
      batch_size = config.batch_size,
      max_concurrency = config.max_concurrency,
      "stream_started"
    );
    ctx.notify(ExecutionEvent::StreamStarted {
      run_id: ctx.run_id().to_string(),
    });

    let (out, receiver) = mpsc::channel(config.lookahead);
    tokio::spawn(drive(ctx, input.boxed(), out).in_current_span());
    FragmentStream::new(receiver)
  }

  /// Run `input` strictly one fragment at a time in the calling task,
  /// without the worker pool. Meant for debugging ordering problems.
  #[instrument(
    name = "scheduler_run_inline",
    skip(self, input),
    fields(run_id = %self.ctx.run_id())
  )]
  pub async fn run_inline<S>(self, input: S) -> RunSummary
  where
    S: Stream<Item = Fragment> + Send + 'static,
  {
    let ctx = self.ctx;
    let finalizer = Finalizer::new(ctx.clone());

    let mut summary = RunSummary::default();
    let result = emit_inline(&ctx, input.boxed(), &mut summary.fragments).await;
    report(&ctx, summary.fragments.len(), &result);
    summary.error = result.err();

    drop(finalizer);
    summary
  }
}

/// Fires the context's finalizer when dropped, including on panic.
struct Finalizer {
  ctx: ExecutionContext,
}

impl Finalizer {
  fn new(ctx: ExecutionContext) -> Self {
    Self { ctx }
  }
}

impl Drop for Finalizer {
  fn drop(&mut self) {
    self.ctx.finalize();
  }
}

/// Top-level emitter task.
async fn drive(ctx: ExecutionContext, input: FragmentSource, out: Output) {
  let finalizer = Finalizer::new(ctx.clone());

  let result = emit(&ctx, input, &out).await;
  let emitted = result.as_ref().map_or(0, |n| *n);
  report(&ctx, emitted, &result);

  if let Err(e) = result {
    if !matches!(e, SchedulerError::OutputClosed) {
      let _ = out.send(Err(e)).await;
    }
  }

  // The consumer sees end-of-stream only after the hook has fired.
  drop(finalizer);
  drop(out);
}

fn report<T>(ctx: &ExecutionContext, fragments: usize, result: &Result<T, SchedulerError>) {
  let run_id = ctx.run_id().to_string();
  match result {
    Ok(_) => {
      info!(fragments, "stream_completed");
      ctx.notify(ExecutionEvent::StreamCompleted { run_id, fragments });
    }
    Err(e) => {
      match e {
        SchedulerError::Cancelled | SchedulerError::OutputClosed => {
          warn!(error = %e, "stream_stopped")
        }
        _ => error!(error = %e, "stream_failed"),
      }
      ctx.notify(ExecutionEvent::StreamFailed {
        run_id,
        error: e.to_string(),
      });
    }
  }
}
