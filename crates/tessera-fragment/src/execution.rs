use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::BoxStream;

use crate::fragment::Fragment;
use crate::result::{ExecutionResult, Outcome};

/// A stream of fragments, as consumed by the scheduler.
pub type FragmentSource = BoxStream<'static, Fragment>;

/// The deferred computation. Called once per start.
pub type Body = Arc<dyn Fn() -> BoxFuture<'static, Outcome> + Send + Sync>;

/// Maps a finished result to more fragments to splice after the origin.
pub type Continuation = Arc<dyn Fn(&ExecutionResult) -> Option<FragmentSource> + Send + Sync>;

/// The work attached to a fragment.
#[derive(Clone, Default)]
pub struct Execution {
  body: Option<Body>,
  timeout: Option<Duration>,
  continuation: Option<Continuation>,
  skip: Option<String>,
  fatal: bool,
}

impl Execution {
  /// An asynchronous computation.
  pub fn new<F, Fut>(f: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
  {
    Self {
      body: Some(Arc::new(move || f().boxed())),
      ..Self::default()
    }
  }

  /// A synchronous computation, evaluated on the worker that runs it.
  pub fn from_fn<F>(f: F) -> Self
  where
    F: Fn() -> Outcome + Send + Sync + 'static,
  {
    Self {
      body: Some(Arc::new(move || future::ready(f()).boxed())),
      ..Self::default()
    }
  }

  /// No computation at all; completes immediately with success.
  pub fn none() -> Self {
    Self::default()
  }

  /// Already known to be skipped. The body, if any, is never called.
  pub fn skip(mut self, reason: impl Into<String>) -> Self {
    self.skip = Some(reason.into());
    self
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn with_continuation<F>(mut self, f: F) -> Self
  where
    F: Fn(&ExecutionResult) -> Option<FragmentSource> + Send + Sync + 'static,
  {
    self.continuation = Some(Arc::new(f));
    self
  }

  /// Mark a failure of this execution as fatal for the whole run.
  pub fn errors_are_fatal(mut self) -> Self {
    self.fatal = true;
    self
  }

  pub fn body(&self) -> Option<&Body> {
    self.body.as_ref()
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.timeout
  }

  pub fn skip_reason(&self) -> Option<&str> {
    self.skip.as_deref()
  }

  pub fn is_fatal(&self) -> bool {
    self.fatal
  }

  pub fn has_continuation(&self) -> bool {
    self.continuation.is_some()
  }

  /// Apply the continuation, if any, to a finished result.
  pub fn continue_with(&self, result: &ExecutionResult) -> Option<FragmentSource> {
    self.continuation.as_ref().and_then(|f| f(result))
  }
}

impl fmt::Debug for Execution {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Execution")
      .field("has_body", &self.body.is_some())
      .field("timeout", &self.timeout)
      .field("has_continuation", &self.continuation.is_some())
      .field("skip", &self.skip)
      .field("fatal", &self.fatal)
      .finish()
  }
}
