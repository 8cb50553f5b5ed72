//! The sequencer's private accumulator.

use tessera_fragment::{Fragment, RunHandle};

/// Fragments waiting to start, runs started since the last barrier, and
/// the last barrier itself.
#[derive(Debug, Default)]
pub struct SchedulerState {
  pending: Vec<Fragment>,
  started: Vec<RunHandle>,
  last_barrier: Option<RunHandle>,
}

impl SchedulerState {
  pub fn pending(&self) -> &[Fragment] {
    &self.pending
  }

  pub fn started(&self) -> &[RunHandle] {
    &self.started
  }

  pub fn last_barrier(&self) -> Option<&RunHandle> {
    self.last_barrier.as_ref()
  }

  /// Executable fragments waiting to start; decorative ones do not count.
  pub fn executable_pending(&self) -> usize {
    self.pending.iter().filter(|f| f.is_executable()).count()
  }

  pub fn is_empty(&self) -> bool {
    self.pending.is_empty() && self.started.is_empty() && self.last_barrier.is_none()
  }

  pub(crate) fn push_pending(&mut self, fragment: Fragment) {
    self.pending.push(fragment);
  }

  pub(crate) fn take_pending(&mut self) -> Vec<Fragment> {
    std::mem::take(&mut self.pending)
  }

  pub(crate) fn take_started(&mut self) -> Vec<RunHandle> {
    std::mem::take(&mut self.started)
  }

  pub(crate) fn record_started(&mut self, handles: impl IntoIterator<Item = RunHandle>) {
    self.started.extend(handles);
  }

  /// Drop pending and started runs, keeping `last_barrier` as the new
  /// synchronization point.
  pub(crate) fn reset(&mut self, last_barrier: Option<RunHandle>) {
    self.pending.clear();
    self.started.clear();
    self.last_barrier = last_barrier;
  }
}
