use crate::execution::Execution;
use crate::handle::RunHandle;
use crate::kind::FragmentKind;
use crate::result::ExecutionResult;

#[derive(Debug, Clone)]
enum RunState {
  Idle,
  Running(RunHandle),
  Done(ExecutionResult),
}

/// One schedulable unit of work.
#[derive(Debug, Clone)]
pub struct Fragment {
  kind: FragmentKind,
  description: String,
  execution: Execution,
  run: RunState,
}

impl Fragment {
  pub fn new(kind: FragmentKind, description: impl Into<String>, execution: Execution) -> Self {
    Self {
      kind,
      description: description.into(),
      execution,
      run: RunState::Idle,
    }
  }

  pub fn text(description: impl Into<String>) -> Self {
    Self::new(FragmentKind::Text, description, Execution::none())
  }

  pub fn example(description: impl Into<String>, execution: Execution) -> Self {
    Self::new(FragmentKind::Example, description, execution)
  }

  pub fn action(description: impl Into<String>, execution: Execution) -> Self {
    Self::new(FragmentKind::Action, description, execution)
  }

  pub fn barrier(description: impl Into<String>, execution: Execution) -> Self {
    Self::new(FragmentKind::Barrier, description, execution)
  }

  pub fn kind(&self) -> FragmentKind {
    self.kind
  }

  pub fn description(&self) -> &str {
    &self.description
  }

  pub fn execution(&self) -> &Execution {
    &self.execution
  }

  pub fn is_executable(&self) -> bool {
    self.kind.is_executable()
  }

  pub fn must_join(&self) -> bool {
    self.kind.must_join()
  }

  /// Same fragment with its execution's errors marked fatal.
  pub fn errors_are_fatal(mut self) -> Self {
    self.execution = self.execution.errors_are_fatal();
    self
  }

  /// Same fragment, now carrying a pending result.
  pub fn started(mut self, handle: RunHandle) -> Self {
    self.run = RunState::Running(handle);
    self
  }

  /// Same fragment, now carrying its result.
  pub fn finished(mut self, result: ExecutionResult) -> Self {
    self.run = RunState::Done(result);
    self
  }

  /// A handle on the run, for started or finished fragments.
  pub fn handle(&self) -> Option<RunHandle> {
    match &self.run {
      RunState::Idle => None,
      RunState::Running(handle) => Some(handle.clone()),
      RunState::Done(result) => Some(RunHandle::finished(result.clone())),
    }
  }

  pub fn result(&self) -> Option<&ExecutionResult> {
    match &self.run {
      RunState::Done(result) => Some(result),
      _ => None,
    }
  }

  pub fn is_started(&self) -> bool {
    !matches!(self.run, RunState::Idle)
  }

  pub fn is_finished(&self) -> bool {
    matches!(self.run, RunState::Done(_))
  }

  /// Wait for the pending result. A fragment that was never started is
  /// returned unchanged.
  pub async fn completed(self) -> Fragment {
    match &self.run {
      RunState::Running(handle) => {
        let result = handle.completed().await;
        self.finished(result)
      }
      _ => self,
    }
  }
}
