//! Splicing continuations and emitting results in order.
//!
//! The decision task keeps a stack of input streams. When a started
//! fragment carries a continuation, the task waits for its result before it
//! reads any further input, then pushes the continuation's fragments on top
//! of the stack. Spliced fragments therefore go through the same sequencer
//! state as if they had been part of the input at that point: later barriers
//! join them and a sequential successor waits for the last of them.

use futures::StreamExt;
use futures::future::{BoxFuture, FutureExt};
use tessera_fragment::{ExecutionResult, Fragment, FragmentSource, Outcome};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info};

use crate::context::ExecutionContext;
use crate::error::SchedulerError;
use crate::events::ExecutionEvent;
use crate::sequencer::{SKIP_ALL_REASON, Sequencer};
use crate::unit;

pub(crate) type Output = mpsc::Sender<Result<Fragment, SchedulerError>>;

/// Fragments a finished result splices after its origin, if any.
///
/// Skipped and fatally failed fragments never expand.
fn expand(
  ctx: &ExecutionContext,
  fragment: &Fragment,
  result: &ExecutionResult,
) -> Option<FragmentSource> {
  if result.outcome.is_skipped() || result.is_fatal_failure() {
    return None;
  }

  let expansion = fragment.execution().continue_with(result)?;
  debug!(description = %fragment.description(), "fragment_expanded");
  ctx.notify(ExecutionEvent::FragmentExpanded {
    run_id: ctx.run_id().to_string(),
    description: fragment.description().to_string(),
  });
  Some(expansion)
}

/// A completed fragment, plus the error that ends the run if it failed
/// fatally.
struct Settled {
  fragment: Fragment,
  fatal: Option<SchedulerError>,
}

fn settle(ctx: &ExecutionContext, fragment: Fragment, result: ExecutionResult) -> Settled {
  info!(
    description = %fragment.description(),
    outcome = %result.outcome,
    duration_ms = result.duration.as_millis() as u64,
    "fragment_completed"
  );
  ctx.notify(ExecutionEvent::FragmentCompleted {
    run_id: ctx.run_id().to_string(),
    description: fragment.description().to_string(),
    outcome: result.outcome.clone(),
  });

  let fatal = result.is_fatal_failure().then(|| {
    error!(
      description = %fragment.description(),
      outcome = %result.outcome,
      "fatal_failure"
    );
    SchedulerError::Fatal {
      description: fragment.description().to_string(),
      outcome: result.outcome.clone(),
    }
  });

  Settled {
    fragment: fragment.finished(result),
    fatal,
  }
}

/// Decision task: feed `input`, and every continuation it produces, through
/// one [`Sequencer`] and send the fragments it starts, in output order.
pub(crate) fn sequence(ctx: &ExecutionContext, input: FragmentSource) -> mpsc::Receiver<Fragment> {
  let (sender, receiver) = mpsc::channel(ctx.config().lookahead);
  let ctx = ctx.clone();

  let task = async move {
    let mut sequencer = Sequencer::new(ctx.clone());
    let mut inputs = vec![input];

    while let Some(current) = inputs.last_mut() {
      let next = tokio::select! {
        biased;
        _ = ctx.cancel_token().cancelled() => return,
        _ = sender.closed() => return,
        next = current.next() => next,
      };
      let Some(fragment) = next else {
        inputs.pop();
        continue;
      };

      let expands = fragment.execution().has_continuation() && !ctx.config().skip_all;
      let mut emitted = sequencer.step(fragment);
      if expands {
        // The origin's result is needed before input continues.
        emitted.extend(sequencer.flush());
      }
      let origin = expands.then(|| emitted.last().cloned()).flatten();

      for started in emitted {
        if sender.send(started).await.is_err() {
          return;
        }
      }

      let Some(origin) = origin else { continue };
      let Some(handle) = origin.handle() else {
        continue;
      };
      let result = tokio::select! {
        biased;
        _ = ctx.cancel_token().cancelled() => return,
        _ = sender.closed() => return,
        result = handle.completed() => result,
      };
      if let Some(expansion) = expand(&ctx, &origin, &result) {
        inputs.push(expansion);
      }
    }

    for started in sequencer.flush() {
      if sender.send(started).await.is_err() {
        return;
      }
    }
  };

  tokio::spawn(task.in_current_span());
  receiver
}

/// Sequence `input`, await every started fragment in order and send it to
/// `out`. Returns how many fragments were sent.
pub(crate) async fn emit(
  ctx: &ExecutionContext,
  input: FragmentSource,
  out: &Output,
) -> Result<usize, SchedulerError> {
  let mut started = sequence(ctx, input);
  let mut emitted = 0;

  loop {
    let next = tokio::select! {
      biased;
      _ = ctx.cancel_token().cancelled() => return Err(SchedulerError::Cancelled),
      next = started.recv() => next,
    };
    let Some(fragment) = next else { break };

    let result = match fragment.handle() {
      Some(handle) => tokio::select! {
        biased;
        _ = ctx.cancel_token().cancelled() => return Err(SchedulerError::Cancelled),
        result = handle.completed() => result,
      },
      None => ExecutionResult::not_run(Outcome::error("fragment was never started")),
    };

    let settled = settle(ctx, fragment, result);
    out
      .send(Ok(settled.fragment))
      .await
      .map_err(|_| SchedulerError::OutputClosed)?;
    emitted += 1;

    if let Some(e) = settled.fatal {
      return Err(e);
    }
  }

  Ok(emitted)
}

/// Run `input` one fragment at a time in the caller's task, expanding
/// continuations in place.
pub(crate) fn emit_inline<'a>(
  ctx: &'a ExecutionContext,
  mut input: FragmentSource,
  out: &'a mut Vec<Fragment>,
) -> BoxFuture<'a, Result<(), SchedulerError>> {
  async move {
    while let Some(fragment) = input.next().await {
      if ctx.is_cancelled() {
        return Err(SchedulerError::Cancelled);
      }

      let fragment = if ctx.config().skip_all {
        unit::skip(fragment, SKIP_ALL_REASON, ctx)
      } else if fragment.must_join() {
        unit::run_inline(fragment.errors_are_fatal(), ctx).await
      } else {
        unit::run_inline(fragment, ctx).await
      };
      let result = fragment
        .result()
        .cloned()
        .unwrap_or_else(|| ExecutionResult::not_run(Outcome::error("fragment was never run")));

      let expansion = expand(ctx, &fragment, &result);
      let settled = settle(ctx, fragment, result);
      out.push(settled.fragment);

      if let Some(e) = settled.fatal {
        return Err(e);
      }
      if let Some(expansion) = expansion {
        emit_inline(ctx, expansion, out).await?;
      }
    }

    Ok(())
  }
  .boxed()
}
