use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid value for {key}: '{value}'")]
  InvalidValue { key: String, value: String },

  #[error("{field} must be greater than zero")]
  Zero { field: &'static str },

  #[error("invalid plan: {0}")]
  InvalidPlan(String),

  #[error("failed to read {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse plan: {0}")]
  Parse(#[from] serde_json::Error),
}
