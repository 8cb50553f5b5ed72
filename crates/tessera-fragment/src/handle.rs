use std::fmt;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;

use crate::result::ExecutionResult;

/// How far a dependency must have progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
  Started,
  Completed,
}

/// The pending result of a started fragment.
///
/// Cloning is cheap; every clone observes the same run.
#[derive(Clone)]
pub struct RunHandle {
  started: watch::Receiver<bool>,
  completed: Shared<BoxFuture<'static, ExecutionResult>>,
}

impl RunHandle {
  /// `started` flips to `true` when the computation begins; `completed`
  /// resolves to its result.
  pub fn new(
    started: watch::Receiver<bool>,
    completed: BoxFuture<'static, ExecutionResult>,
  ) -> Self {
    Self {
      started,
      completed: completed.shared(),
    }
  }

  /// A handle that is already started and completed.
  pub fn finished(result: ExecutionResult) -> Self {
    let (_, started) = watch::channel(true);
    Self::new(started, futures::future::ready(result).boxed())
  }

  /// Resolves once the computation has begun (or can no longer begin).
  pub async fn started(&self) {
    let mut started = self.started.clone();
    // A dropped sender means the run is over, which implies it started.
    let _ = started.wait_for(|started| *started).await;
  }

  pub async fn completed(&self) -> ExecutionResult {
    self.completed.clone().await
  }

  pub async fn ready(&self, readiness: Readiness) {
    match readiness {
      Readiness::Started => self.started().await,
      Readiness::Completed => {
        self.completed().await;
      }
    }
  }

  pub fn has_started(&self) -> bool {
    *self.started.borrow() || self.completed.peek().is_some()
  }

  /// The result, if the run already finished and someone awaited it.
  pub fn peek(&self) -> Option<ExecutionResult> {
    self.completed.peek().cloned()
  }
}

impl fmt::Debug for RunHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RunHandle")
      .field("started", &*self.started.borrow())
      .field("completed", &self.completed.peek().is_some())
      .finish()
  }
}

/// A run that must reach `readiness` before a dependent may start.
#[derive(Debug, Clone)]
pub struct Dependency {
  pub handle: RunHandle,
  pub readiness: Readiness,
}

impl Dependency {
  pub fn started(handle: RunHandle) -> Self {
    Self {
      handle,
      readiness: Readiness::Started,
    }
  }

  pub fn completed(handle: RunHandle) -> Self {
    Self {
      handle,
      readiness: Readiness::Completed,
    }
  }

  pub async fn wait(&self) {
    self.handle.ready(self.readiness).await
  }
}
