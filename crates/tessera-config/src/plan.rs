use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A plan file: an ordered list of synthetic fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDef {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  pub fragments: Vec<FragmentDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentDef {
  #[serde(default)]
  pub kind: KindDef,
  pub description: String,
  /// Simulated work time.
  #[serde(default)]
  pub delay_ms: u64,
  #[serde(default)]
  pub outcome: OutcomeDef,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  /// Skip reason; the fragment never runs when set.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub skip: Option<String>,
  /// Fragments spliced after this one when it succeeds.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub then: Vec<FragmentDef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindDef {
  Text,
  #[default]
  Example,
  Action,
  Barrier,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeDef {
  #[default]
  Success,
  Failure,
  Error,
}

impl PlanDef {
  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    let plan: PlanDef = serde_json::from_str(content)?;
    plan.validate()?;
    Ok(plan)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.display().to_string(),
      source,
    })?;
    Self::from_json(&content)
  }

  /// Check every fragment, including nested continuations.
  pub fn validate(&self) -> Result<(), ConfigError> {
    self.fragments.iter().try_for_each(FragmentDef::validate)
  }

  /// Number of fragments including every nested continuation.
  pub fn total_fragments(&self) -> usize {
    self.fragments.iter().map(FragmentDef::total).sum()
  }
}

impl FragmentDef {
  fn validate(&self) -> Result<(), ConfigError> {
    if self.description.trim().is_empty() {
      return Err(ConfigError::InvalidPlan(
        "fragment description must not be empty".to_string(),
      ));
    }

    if self.kind == KindDef::Text {
      if self.outcome != OutcomeDef::Success || self.delay_ms > 0 {
        return Err(ConfigError::InvalidPlan(format!(
          "text fragment '{}' cannot carry work",
          self.description
        )));
      }
      if !self.then.is_empty() {
        return Err(ConfigError::InvalidPlan(format!(
          "text fragment '{}' cannot have continuations",
          self.description
        )));
      }
    }

    if self.timeout_ms == Some(0) {
      return Err(ConfigError::Zero { field: "timeout_ms" });
    }

    self.then.iter().try_for_each(FragmentDef::validate)
  }

  fn total(&self) -> usize {
    1 + self.then.iter().map(FragmentDef::total).sum::<usize>()
  }
}
