//! Tessera Fragment
//!
//! The data model shared by the scheduler and its consumers:
//!
//! - [`Fragment`]: a description, a [`FragmentKind`] and an [`Execution`]
//! - [`Execution`]: the deferred computation, its timeout override, its
//!   continuation and its fatality flag
//! - [`ExecutionResult`] / [`Outcome`]: what a computation produced
//! - [`RunHandle`]: the pending result of a started fragment, awaitable for
//!   "started" or "completed" readiness
//!
//! Fragments are immutable values. Starting one produces a new fragment that
//! carries a [`RunHandle`]; awaiting it produces a fragment carrying its
//! [`ExecutionResult`].

mod execution;
mod fragment;
mod handle;
mod kind;
mod result;

pub use execution::{Body, Continuation, Execution, FragmentSource};
pub use fragment::Fragment;
pub use handle::{Dependency, Readiness, RunHandle};
pub use kind::FragmentKind;
pub use result::{ExecutionResult, Outcome};
