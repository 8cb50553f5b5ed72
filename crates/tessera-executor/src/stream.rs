//! The output side of a run.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tessera_fragment::Fragment;
use tokio::sync::mpsc;

use crate::error::SchedulerError;

/// Completed fragments in input order, continuations spliced in place.
///
/// Ends after the last fragment, or right after an `Err` item. By the time
/// the stream yields `None` the run's shutdown hook has already fired.
pub struct FragmentStream {
  receiver: mpsc::Receiver<Result<Fragment, SchedulerError>>,
}

impl FragmentStream {
  pub(crate) fn new(receiver: mpsc::Receiver<Result<Fragment, SchedulerError>>) -> Self {
    Self { receiver }
  }

  /// Drain the stream into a summary.
  pub async fn summarize(mut self) -> RunSummary {
    let mut summary = RunSummary::default();
    while let Some(item) = self.next().await {
      match item {
        Ok(fragment) => summary.fragments.push(fragment),
        Err(e) => summary.error = Some(e),
      }
    }
    summary
  }
}

impl Stream for FragmentStream {
  type Item = Result<Fragment, SchedulerError>;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    self.receiver.poll_recv(cx)
  }
}

/// Everything a run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
  pub fragments: Vec<Fragment>,
  /// Why the run ended early, if it did.
  pub error: Option<SchedulerError>,
}

impl RunSummary {
  pub fn is_ok(&self) -> bool {
    self.error.is_none()
  }

  pub fn descriptions(&self) -> Vec<&str> {
    self.fragments.iter().map(Fragment::description).collect()
  }

  pub fn successes(&self) -> usize {
    self.count(|f| f.result().is_some_and(|r| r.outcome.is_success()) && f.is_executable())
  }

  pub fn failures(&self) -> usize {
    self.count(|f| f.result().is_some_and(|r| r.outcome.is_failure()))
  }

  pub fn skipped(&self) -> usize {
    self.count(|f| f.result().is_some_and(|r| r.outcome.is_skipped()))
  }

  fn count(&self, predicate: impl Fn(&Fragment) -> bool) -> usize {
    self.fragments.iter().filter(|f| predicate(f)).count()
  }
}
