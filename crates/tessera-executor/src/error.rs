//! Scheduler error types.

use tessera_config::ConfigError;
use tessera_fragment::Outcome;

/// Errors that end a run.
///
/// Ordinary fragment failures are not errors; they are carried as
/// [`Outcome`]s on the emitted fragments.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
  /// A fragment whose errors are fatal did not succeed.
  #[error("fatal failure in '{description}': {outcome}")]
  Fatal {
    description: String,
    outcome: Outcome,
  },

  /// The run was cancelled through its cancellation token.
  #[error("run cancelled")]
  Cancelled,

  /// The consumer dropped the output stream.
  #[error("output stream closed")]
  OutputClosed,

  /// The configuration was rejected.
  #[error("invalid configuration: {source}")]
  Config {
    #[from]
    source: ConfigError,
  },
}
