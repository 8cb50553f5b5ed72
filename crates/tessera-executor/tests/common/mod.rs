//! Helpers shared by the scheduler integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::StreamExt;
use tessera_config::ExecutionConfig;
use tessera_executor::{ExecutionContext, RunSummary, Scheduler};
use tessera_fragment::{Execution, Fragment, FragmentSource, Outcome};

/// Start and end instants of every synthetic computation, by name.
#[derive(Clone, Default)]
pub struct Timeline {
  spans: Arc<Mutex<HashMap<String, (Instant, Option<Instant>)>>>,
  running: Arc<AtomicUsize>,
  peak: Arc<AtomicUsize>,
}

impl Timeline {
  pub fn new() -> Self {
    Self::default()
  }

  fn begin(&self, name: &str) {
    self
      .spans
      .lock()
      .unwrap()
      .insert(name.to_string(), (Instant::now(), None));
    let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(now, Ordering::SeqCst);
  }

  fn end(&self, name: &str) {
    self.running.fetch_sub(1, Ordering::SeqCst);
    if let Some(span) = self.spans.lock().unwrap().get_mut(name) {
      span.1 = Some(Instant::now());
    }
  }

  pub fn started(&self, name: &str) -> Instant {
    self.spans.lock().unwrap()[name].0
  }

  pub fn ended(&self, name: &str) -> Instant {
    self.spans.lock().unwrap()[name]
      .1
      .unwrap_or_else(|| panic!("{} never finished", name))
  }

  pub fn ran(&self, name: &str) -> bool {
    self.spans.lock().unwrap().contains_key(name)
  }

  pub fn runs(&self) -> usize {
    self.spans.lock().unwrap().len()
  }

  /// Most computations observed running at the same time.
  pub fn peak(&self) -> usize {
    self.peak.load(Ordering::SeqCst)
  }

  /// A computation that sleeps `ms` and then returns `outcome`.
  pub fn work(&self, name: &str, ms: u64, outcome: Outcome) -> Execution {
    let timeline = self.clone();
    let name = name.to_string();
    Execution::new(move || {
      let timeline = timeline.clone();
      let name = name.clone();
      let outcome = outcome.clone();
      async move {
        timeline.begin(&name);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        timeline.end(&name);
        outcome
      }
    })
  }

  pub fn example(&self, name: &str, ms: u64) -> Fragment {
    Fragment::example(name, self.work(name, ms, Outcome::Success))
  }

  pub fn barrier(&self, name: &str, ms: u64) -> Fragment {
    Fragment::barrier(name, self.work(name, ms, Outcome::Success))
  }
}

pub fn config(batch_size: usize) -> ExecutionConfig {
  ExecutionConfig {
    batch_size,
    max_concurrency: 16,
    ..ExecutionConfig::default()
  }
}

pub fn source(fragments: Vec<Fragment>) -> FragmentSource {
  futures::stream::iter(fragments).boxed()
}

/// A context whose shutdown hook increments the returned counter.
pub fn counted_context(config: ExecutionConfig) -> (ExecutionContext, Arc<AtomicUsize>) {
  let shutdowns = Arc::new(AtomicUsize::new(0));
  let counter = shutdowns.clone();
  let ctx = ExecutionContext::builder(config)
    .on_shutdown(move || {
      counter.fetch_add(1, Ordering::SeqCst);
    })
    .build()
    .expect("valid config");
  (ctx, shutdowns)
}

pub async fn run(config: ExecutionConfig, fragments: Vec<Fragment>) -> RunSummary {
  Scheduler::from_config(config)
    .expect("valid config")
    .run(source(fragments))
    .summarize()
    .await
}

pub fn outcome(summary: &RunSummary, description: &str) -> Outcome {
  summary
    .fragments
    .iter()
    .find(|f| f.description() == description)
    .and_then(|f| f.result())
    .map(|r| r.outcome.clone())
    .unwrap_or_else(|| panic!("no result for {}", description))
}
