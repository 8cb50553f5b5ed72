//! The scheduling state machine.
//!
//! A [`Sequencer`] consumes fragments one at a time and decides which of them
//! start now. It never waits on a computation; every dependency it declares
//! is handed to the execution unit, which waits on its own worker.

use tessera_fragment::{Dependency, Fragment, FragmentKind};
use tracing::{debug, info};

use crate::context::ExecutionContext;
use crate::state::SchedulerState;
use crate::unit;

pub(crate) const SKIP_ALL_REASON: &str = "skip all";

#[derive(Debug, Clone, Copy)]
enum Policy {
  SkipAll,
  Sequential,
  Concurrent { batch_size: usize },
}

/// Single-threaded scheduling decisions for one fragment stream.
pub struct Sequencer {
  ctx: ExecutionContext,
  state: SchedulerState,
}

impl Sequencer {
  pub fn new(ctx: ExecutionContext) -> Self {
    Self {
      ctx,
      state: SchedulerState::default(),
    }
  }

  pub fn state(&self) -> &SchedulerState {
    &self.state
  }

  fn policy(&self) -> Policy {
    let config = self.ctx.config();
    if config.skip_all {
      Policy::SkipAll
    } else if config.sequential {
      Policy::Sequential
    } else {
      Policy::Concurrent {
        batch_size: config.batch_size,
      }
    }
  }

  /// Feed one fragment. Returns the fragments emitted by this step, started
  /// or skipped, in input order.
  pub fn step(&mut self, fragment: Fragment) -> Vec<Fragment> {
    match (self.policy(), fragment.kind()) {
      (Policy::SkipAll, _) => {
        self.state.reset(None);
        vec![unit::skip(fragment, SKIP_ALL_REASON, &self.ctx)]
      }

      (Policy::Sequential, kind) => {
        let fragment = if kind.must_join() {
          fragment.errors_are_fatal()
        } else {
          fragment
        };
        let dependencies = self
          .state
          .started()
          .last()
          .cloned()
          .map(Dependency::completed)
          .into_iter()
          .collect();

        let started = unit::start(fragment, dependencies, &self.ctx);
        self.state.reset(None);
        self.state.record_started(started.handle());
        vec![started]
      }

      (Policy::Concurrent { .. }, FragmentKind::Barrier) => {
        let mut emitted = self.start_pending();
        let joined: Vec<Dependency> = self
          .state
          .take_started()
          .into_iter()
          .chain(emitted.iter().filter_map(Fragment::handle))
          .map(Dependency::completed)
          .collect();

        info!(
          description = %fragment.description(),
          joined = joined.len(),
          "barrier_started"
        );
        let barrier = unit::start(fragment.errors_are_fatal(), joined, &self.ctx);
        self.state.reset(barrier.handle());
        emitted.push(barrier);
        emitted
      }

      (Policy::Concurrent { batch_size }, _) => {
        self.state.push_pending(fragment);
        if self.state.executable_pending() < batch_size {
          return Vec::new();
        }

        let emitted = self.start_pending();
        self
          .state
          .record_started(emitted.iter().filter_map(Fragment::handle));
        emitted
      }
    }
  }

  /// Start whatever is still pending. Called at end of input, and to close
  /// a batch early when its last fragment's result is needed right away.
  pub fn flush(&mut self) -> Vec<Fragment> {
    let emitted = self.start_pending();
    self
      .state
      .record_started(emitted.iter().filter_map(Fragment::handle));
    emitted
  }

  /// Start every pending fragment, each depending only on the last barrier.
  fn start_pending(&mut self) -> Vec<Fragment> {
    let pending = self.state.take_pending();
    if pending.is_empty() {
      return pending;
    }

    let barrier = self.state.last_barrier().cloned();
    info!(
      fragments = pending.len(),
      after_barrier = barrier.is_some(),
      "batch_started"
    );

    pending
      .into_iter()
      .map(|fragment| {
        debug!(description = %fragment.description(), "starting fragment");
        let dependencies = barrier
          .clone()
          .map(Dependency::started)
          .into_iter()
          .collect();
        unit::start(fragment, dependencies, &self.ctx)
      })
      .collect()
  }
}
