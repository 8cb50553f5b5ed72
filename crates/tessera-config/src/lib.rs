//! Tessera Config
//!
//! This crate contains the serializable configuration types for tessera.
//!
//! - [`ExecutionConfig`] controls how the scheduler runs a fragment stream
//!   (skip-all, sequential mode, batch size, timeouts, concurrency). It can be
//!   deserialized from JSON or read from `TESSERA_*` environment variables.
//! - [`PlanDef`] is the plan file consumed by the `tessera` CLI: a list of
//!   synthetic fragment definitions used to drive the scheduler end to end.

mod error;
mod execution;
mod plan;

pub use error::ConfigError;
pub use execution::ExecutionConfig;
pub use plan::{FragmentDef, KindDef, OutcomeDef, PlanDef};
