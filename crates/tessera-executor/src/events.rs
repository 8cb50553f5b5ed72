//! Execution events and notifiers for observability.
//!
//! Events are emitted while a fragment stream runs so consumers can observe
//! progress, stream it to a UI, or assert on scheduling order in tests.

use serde::{Deserialize, Serialize};
use tessera_fragment::{FragmentKind, Outcome};
use tokio::sync::mpsc;

/// Events emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// The top-level stream started.
  StreamStarted { run_id: String },

  /// A fragment was skipped without running.
  FragmentSkipped {
    run_id: String,
    description: String,
    reason: String,
  },

  /// A fragment's computation began.
  FragmentStarted {
    run_id: String,
    description: String,
    kind: FragmentKind,
  },

  /// A fragment's result was handed downstream.
  FragmentCompleted {
    run_id: String,
    description: String,
    outcome: Outcome,
  },

  /// A fragment's continuation produced more fragments.
  FragmentExpanded { run_id: String, description: String },

  /// The stream drained normally.
  StreamCompleted { run_id: String, fragments: usize },

  /// The stream ended early.
  StreamFailed { run_id: String, error: String },
}

/// Trait for receiving execution events.
///
/// The scheduler calls `notify` from its decision task, its emitter and its
/// workers, so implementations must be cheap and non-blocking.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls a worker.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// A notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
