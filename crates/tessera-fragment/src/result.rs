use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// What a computation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
  Success,
  Failure { message: String },
  Error { message: String },
  Skipped { reason: String },
  Timeout { after: Duration },
}

impl Outcome {
  pub fn failure(message: impl Into<String>) -> Self {
    Outcome::Failure {
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Outcome::Error {
      message: message.into(),
    }
  }

  pub fn skipped(reason: impl Into<String>) -> Self {
    Outcome::Skipped {
      reason: reason.into(),
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self, Outcome::Success)
  }

  /// Failures, errors and timeouts.
  pub fn is_failure(&self) -> bool {
    matches!(
      self,
      Outcome::Failure { .. } | Outcome::Error { .. } | Outcome::Timeout { .. }
    )
  }

  pub fn is_skipped(&self) -> bool {
    matches!(self, Outcome::Skipped { .. })
  }
}

impl fmt::Display for Outcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Outcome::Success => write!(f, "success"),
      Outcome::Failure { message } => write!(f, "failure: {}", message),
      Outcome::Error { message } => write!(f, "error: {}", message),
      Outcome::Skipped { reason } => write!(f, "skipped: {}", reason),
      Outcome::Timeout { after } => write!(f, "timed out after {:?}", after),
    }
  }
}

/// Outcome of one execution plus its timing.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
  pub outcome: Outcome,
  /// When the computation began. `None` when nothing ran.
  pub started_at: Option<Instant>,
  pub duration: Duration,
  /// The execution was flagged "errors are fatal".
  pub fatal: bool,
}

impl ExecutionResult {
  pub fn new(outcome: Outcome, started_at: Instant, fatal: bool) -> Self {
    Self {
      outcome,
      started_at: Some(started_at),
      duration: started_at.elapsed(),
      fatal,
    }
  }

  /// A result for a fragment that never ran.
  pub fn skipped(reason: impl Into<String>) -> Self {
    Self::not_run(Outcome::skipped(reason))
  }

  pub fn not_run(outcome: Outcome) -> Self {
    Self {
      outcome,
      started_at: None,
      duration: Duration::ZERO,
      fatal: false,
    }
  }

  /// A failing result on an execution whose errors are fatal.
  pub fn is_fatal_failure(&self) -> bool {
    self.fatal && self.outcome.is_failure()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_failure_classification() {
    assert!(!Outcome::Success.is_failure());
    assert!(Outcome::failure("x").is_failure());
    assert!(Outcome::error("x").is_failure());
    assert!(
      Outcome::Timeout {
        after: Duration::from_millis(5)
      }
      .is_failure()
    );
    assert!(!Outcome::skipped("x").is_failure());
    assert!(Outcome::skipped("x").is_skipped());
  }

  #[test]
  fn test_fatal_only_when_flagged_and_failing() {
    let mut result = ExecutionResult::new(Outcome::error("boom"), Instant::now(), false);
    assert!(!result.is_fatal_failure());

    result.fatal = true;
    assert!(result.is_fatal_failure());

    result.outcome = Outcome::Success;
    assert!(!result.is_fatal_failure());
  }

  #[test]
  fn test_outcome_serialization() {
    let json = serde_json::to_value(Outcome::failure("expected 1")).unwrap();
    assert_eq!(
      json,
      serde_json::json!({ "status": "failure", "message": "expected 1" })
    );

    let json = serde_json::to_value(Outcome::Success).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "success" }));
  }
}
