//! Shared, read-only state for one run.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tessera_config::ExecutionConfig;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::SchedulerError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::shutdown::ShutdownHook;

/// Bounds how many fragment computations run at once.
#[derive(Debug, Clone)]
pub struct WorkerPool {
  permits: Arc<Semaphore>,
  size: usize,
}

impl WorkerPool {
  pub fn new(size: usize) -> Self {
    Self {
      permits: Arc::new(Semaphore::new(size)),
      size,
    }
  }

  /// Wait for a free worker. `None` once the pool is closed.
  pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
    self.permits.clone().acquire_owned().await.ok()
  }

  pub fn size(&self) -> usize {
    self.size
  }

  pub fn available(&self) -> usize {
    self.permits.available_permits()
  }

  pub fn close(&self) {
    self.permits.close();
  }

  pub fn is_closed(&self) -> bool {
    self.permits.is_closed()
  }
}

struct ContextInner {
  run_id: String,
  config: ExecutionConfig,
  pool: WorkerPool,
  shutdown: ShutdownHook,
  notifier: Arc<dyn ExecutionNotifier>,
  cancel: CancellationToken,
}

/// Configuration plus the resources every started fragment shares.
///
/// Cheap to clone. A context serves a single run: once finalized its worker
/// pool is closed and its shutdown hook has fired.
#[derive(Clone)]
pub struct ExecutionContext {
  inner: Arc<ContextInner>,
}

impl ExecutionContext {
  /// A context with default collaborators.
  pub fn new(config: ExecutionConfig) -> Result<Self, SchedulerError> {
    Self::builder(config).build()
  }

  pub fn builder(config: ExecutionConfig) -> ContextBuilder {
    ContextBuilder {
      config,
      shutdown: ShutdownHook::noop(),
      notifier: Arc::new(NoopNotifier),
      cancel: CancellationToken::new(),
    }
  }

  pub fn run_id(&self) -> &str {
    &self.inner.run_id
  }

  pub fn config(&self) -> &ExecutionConfig {
    &self.inner.config
  }

  pub fn pool(&self) -> &WorkerPool {
    &self.inner.pool
  }

  pub fn shutdown(&self) -> &ShutdownHook {
    &self.inner.shutdown
  }

  pub fn cancel_token(&self) -> &CancellationToken {
    &self.inner.cancel
  }

  pub fn is_cancelled(&self) -> bool {
    self.inner.cancel.is_cancelled()
  }

  /// Fragment override, else the configured default, else none.
  pub fn timeout_for(&self, fragment_timeout: Option<Duration>) -> Option<Duration> {
    fragment_timeout.or_else(|| self.inner.config.timeout())
  }

  pub fn notify(&self, event: ExecutionEvent) {
    self.inner.notifier.notify(event);
  }

  /// Release shared resources and run the shutdown hook, once.
  pub fn finalize(&self) -> bool {
    self.inner.pool.close();
    let fired = self.inner.shutdown.fire();
    if fired {
      info!(run_id = %self.inner.run_id, "shutdown_hook_fired");
    }
    fired
  }
}

impl fmt::Debug for ExecutionContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ExecutionContext")
      .field("run_id", &self.inner.run_id)
      .field("config", &self.inner.config)
      .field("pool", &self.inner.pool)
      .field("shutdown", &self.inner.shutdown)
      .finish()
  }
}

/// Builder for [`ExecutionContext`].
pub struct ContextBuilder {
  config: ExecutionConfig,
  shutdown: ShutdownHook,
  notifier: Arc<dyn ExecutionNotifier>,
  cancel: CancellationToken,
}

impl ContextBuilder {
  /// Finalizer to run once the whole stream has drained.
  pub fn on_shutdown<F>(mut self, action: F) -> Self
  where
    F: FnOnce() + Send + 'static,
  {
    self.shutdown = ShutdownHook::new(action);
    self
  }

  pub fn shutdown_hook(mut self, hook: ShutdownHook) -> Self {
    self.shutdown = hook;
    self
  }

  pub fn notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
    self.cancel = cancel;
    self
  }

  pub fn build(self) -> Result<ExecutionContext, SchedulerError> {
    self.config.validate()?;

    Ok(ExecutionContext {
      inner: Arc::new(ContextInner {
        run_id: uuid::Uuid::new_v4().to_string(),
        pool: WorkerPool::new(self.config.max_concurrency),
        config: self.config,
        shutdown: self.shutdown,
        notifier: self.notifier,
        cancel: self.cancel,
      }),
    })
  }
}
