use serde::{Deserialize, Serialize};

/// Classification of a fragment, matched once by the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
  /// Decorative text. Never runs anything and never counts toward a batch.
  Text,
  /// Reported unit of work.
  Example,
  /// Executable side effect that does not synchronize.
  Action,
  /// Join point: everything before it completes before it starts.
  Barrier,
}

impl FragmentKind {
  pub fn is_executable(self) -> bool {
    !matches!(self, FragmentKind::Text)
  }

  pub fn must_join(self) -> bool {
    matches!(self, FragmentKind::Barrier)
  }
}
