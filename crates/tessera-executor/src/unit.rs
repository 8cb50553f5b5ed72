//! Execution units: starting one fragment's computation.

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tessera_fragment::{
  Body, Dependency, ExecutionResult, Fragment, FragmentKind, Outcome, RunHandle,
};
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{debug, instrument, warn};

use crate::context::ExecutionContext;
use crate::events::ExecutionEvent;

/// Everything a worker needs from the fragment it runs.
struct UnitSpec {
  description: String,
  kind: FragmentKind,
  body: Option<Body>,
  fatal: bool,
  timeout: Option<Duration>,
}

impl UnitSpec {
  fn of(fragment: &Fragment, ctx: &ExecutionContext) -> Self {
    let execution = fragment.execution();
    Self {
      description: fragment.description().to_string(),
      kind: fragment.kind(),
      body: execution.body().cloned(),
      fatal: execution.is_fatal(),
      timeout: ctx.timeout_for(execution.timeout()),
    }
  }
}

/// Mark a fragment skipped without running it.
pub fn skip(fragment: Fragment, reason: &str, ctx: &ExecutionContext) -> Fragment {
  ctx.notify(ExecutionEvent::FragmentSkipped {
    run_id: ctx.run_id().to_string(),
    description: fragment.description().to_string(),
    reason: reason.to_string(),
  });
  fragment.finished(ExecutionResult::skipped(reason))
}

/// Start a fragment once `dependencies` are ready.
///
/// Returns immediately with a fragment carrying a pending result. The
/// computation runs on the worker pool after every dependency reached its
/// readiness; its outcome is reclassified as a timeout if it outlives the
/// fragment's timeout, but it is never cancelled.
pub fn start(
  fragment: Fragment,
  dependencies: Vec<Dependency>,
  ctx: &ExecutionContext,
) -> Fragment {
  if fragment.is_started() {
    return fragment;
  }
  if let Some(reason) = fragment.execution().skip_reason() {
    let reason = reason.to_string();
    return skip(fragment, &reason, ctx);
  }

  let spec = UnitSpec::of(&fragment, ctx);
  let (started_tx, started_rx) = watch::channel(false);
  let worker = tokio::spawn(execute(spec, dependencies, started_tx, ctx.clone()));

  let completed = async move {
    match worker.await {
      Ok(result) => result,
      Err(e) => ExecutionResult::not_run(Outcome::error(format!("worker failed: {}", e))),
    }
  }
  .boxed();

  fragment.started(RunHandle::new(started_rx, completed))
}

#[instrument(
  name = "fragment_execute",
  skip_all,
  fields(description = %spec.description, kind = ?spec.kind)
)]
async fn execute(
  spec: UnitSpec,
  dependencies: Vec<Dependency>,
  started: watch::Sender<bool>,
  ctx: ExecutionContext,
) -> ExecutionResult {
  for dependency in &dependencies {
    dependency.wait().await;
  }

  if ctx.is_cancelled() {
    started.send_replace(true);
    return ExecutionResult::skipped("run cancelled");
  }

  let Some(body) = spec.body else {
    started.send_replace(true);
    return ExecutionResult::new(Outcome::Success, Instant::now(), spec.fatal);
  };

  let Some(permit) = ctx.pool().acquire().await else {
    started.send_replace(true);
    return ExecutionResult::not_run(Outcome::error("worker pool closed"));
  };

  let began = Instant::now();
  started.send_replace(true);
  ctx.notify(ExecutionEvent::FragmentStarted {
    run_id: ctx.run_id().to_string(),
    description: spec.description.clone(),
    kind: spec.kind,
  });
  debug!(
    description = %spec.description,
    dependencies = dependencies.len(),
    "fragment_started"
  );

  // Detached so a timeout only stops waiting; the computation keeps its
  // worker until it returns.
  let computation = tokio::spawn(async move {
    let outcome = body().await;
    drop(permit);
    outcome
  });

  let outcome = match spec.timeout {
    Some(limit) => match tokio::time::timeout(limit, computation).await {
      Ok(joined) => joined_outcome(joined),
      Err(_) => {
        warn!(
          description = %spec.description,
          timeout_ms = limit.as_millis() as u64,
          "fragment_timed_out"
        );
        Outcome::Timeout { after: limit }
      }
    },
    None => joined_outcome(computation.await),
  };

  ExecutionResult::new(outcome, began, spec.fatal)
}

fn joined_outcome(joined: Result<Outcome, JoinError>) -> Outcome {
  match joined {
    Ok(outcome) => outcome,
    Err(e) if e.is_panic() => Outcome::error(format!("execution panicked: {}", e)),
    Err(e) => Outcome::error(format!("execution aborted: {}", e)),
  }
}

/// Run a fragment's computation in the caller's task.
///
/// There are no dependencies and no worker pool. A computation that
/// outlives its timeout runs to the end and is then reported as timed out.
pub async fn run_inline(fragment: Fragment, ctx: &ExecutionContext) -> Fragment {
  if fragment.is_finished() {
    return fragment;
  }
  if let Some(reason) = fragment.execution().skip_reason() {
    let reason = reason.to_string();
    return skip(fragment, &reason, ctx);
  }

  let spec = UnitSpec::of(&fragment, ctx);
  let began = Instant::now();
  let Some(body) = spec.body else {
    return fragment.finished(ExecutionResult::new(Outcome::Success, began, spec.fatal));
  };

  ctx.notify(ExecutionEvent::FragmentStarted {
    run_id: ctx.run_id().to_string(),
    description: spec.description.clone(),
    kind: spec.kind,
  });

  let outcome = match AssertUnwindSafe(async { body().await }).catch_unwind().await {
    Ok(outcome) => outcome,
    Err(_) => Outcome::error("execution panicked"),
  };
  let outcome = match spec.timeout {
    Some(limit) if began.elapsed() > limit => Outcome::Timeout { after: limit },
    _ => outcome,
  };

  fragment.finished(ExecutionResult::new(outcome, began, spec.fatal))
}
