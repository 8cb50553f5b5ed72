use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_SKIP_ALL: &str = "TESSERA_SKIP_ALL";
pub const ENV_SEQUENTIAL: &str = "TESSERA_SEQUENTIAL";
pub const ENV_BATCH_SIZE: &str = "TESSERA_BATCH_SIZE";
pub const ENV_TIMEOUT_MS: &str = "TESSERA_TIMEOUT_MS";
pub const ENV_MAX_CONCURRENCY: &str = "TESSERA_MAX_CONCURRENCY";
pub const ENV_LOOKAHEAD: &str = "TESSERA_LOOKAHEAD";

const DEFAULT_LOOKAHEAD: usize = 64;

/// Scheduling configuration for a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
  /// Mark every fragment skipped without running anything.
  pub skip_all: bool,
  /// Run fragments strictly one after another.
  pub sequential: bool,
  /// Number of executable fragments accumulated before a batch is started.
  pub batch_size: usize,
  /// Default timeout for fragments that do not set their own.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  /// Maximum number of computations running at the same time.
  pub max_concurrency: usize,
  /// How many started fragments may queue ahead of the consumer.
  pub lookahead: usize,
}

impl Default for ExecutionConfig {
  fn default() -> Self {
    let parallelism = std::thread::available_parallelism()
      .map(NonZeroUsize::get)
      .unwrap_or(1);

    Self {
      skip_all: false,
      sequential: false,
      batch_size: parallelism,
      timeout_ms: None,
      max_concurrency: parallelism,
      lookahead: DEFAULT_LOOKAHEAD,
    }
  }
}

impl ExecutionConfig {
  /// Defaults overridden by the `TESSERA_*` environment variables.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::default().merge_env(|key| std::env::var(key).ok())
  }

  /// Override fields with values returned by `lookup` for each `TESSERA_*` key.
  ///
  /// Only parses; call [`validate`](Self::validate) once every other
  /// override has been applied.
  pub fn merge_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(value) = lookup(ENV_SKIP_ALL) {
      self.skip_all = parse_bool(ENV_SKIP_ALL, &value)?;
    }
    if let Some(value) = lookup(ENV_SEQUENTIAL) {
      self.sequential = parse_bool(ENV_SEQUENTIAL, &value)?;
    }
    if let Some(value) = lookup(ENV_BATCH_SIZE) {
      self.batch_size = parse_number(ENV_BATCH_SIZE, &value)?;
    }
    if let Some(value) = lookup(ENV_TIMEOUT_MS) {
      self.timeout_ms = Some(parse_number(ENV_TIMEOUT_MS, &value)?);
    }
    if let Some(value) = lookup(ENV_MAX_CONCURRENCY) {
      self.max_concurrency = parse_number(ENV_MAX_CONCURRENCY, &value)?;
    }
    if let Some(value) = lookup(ENV_LOOKAHEAD) {
      self.lookahead = parse_number(ENV_LOOKAHEAD, &value)?;
    }

    Ok(self)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.batch_size == 0 {
      return Err(ConfigError::Zero {
        field: "batch_size",
      });
    }
    if self.max_concurrency == 0 {
      return Err(ConfigError::Zero {
        field: "max_concurrency",
      });
    }
    if self.lookahead == 0 {
      return Err(ConfigError::Zero { field: "lookahead" });
    }
    Ok(())
  }

  /// The default per-fragment timeout, if any.
  pub fn timeout(&self) -> Option<Duration> {
    self.timeout_ms.map(Duration::from_millis)
  }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
  match value.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" | "" => Ok(false),
    _ => Err(ConfigError::InvalidValue {
      key: key.to_string(),
      value: value.to_string(),
    }),
  }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
  value
    .trim()
    .parse()
    .map_err(|_| ConfigError::InvalidValue {
      key: key.to_string(),
      value: value.to_string(),
    })
}
