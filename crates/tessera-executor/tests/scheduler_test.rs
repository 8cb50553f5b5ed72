//! Ordering, batching, barrier and sequential-mode behaviour of a full run.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{Timeline, config, counted_context, outcome, run, source};
use tessera_config::ExecutionConfig;
use tessera_executor::{
  ChannelNotifier, ExecutionContext, ExecutionEvent, Scheduler, Sequencer,
};
use tessera_fragment::{Execution, Fragment, Outcome};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_output_order_matches_input() {
  let timeline = Timeline::new();
  // Later fragments finish first.
  let fragments: Vec<_> = (0..6)
    .map(|i| timeline.example(&format!("f{}", i), 60 - i * 10))
    .collect();

  let summary = run(config(3), fragments).await;

  assert!(summary.is_ok());
  assert_eq!(
    summary.descriptions(),
    vec!["f0", "f1", "f2", "f3", "f4", "f5"]
  );
  assert_eq!(summary.successes(), 6);
  assert_eq!(timeline.runs(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_text_fragments_pass_through() {
  let timeline = Timeline::new();
  let fragments = vec![
    Fragment::text("intro"),
    timeline.example("f1", 10),
    Fragment::text("middle"),
    timeline.example("f2", 5),
  ];

  let summary = run(config(1), fragments).await;

  assert_eq!(summary.descriptions(), vec!["intro", "f1", "middle", "f2"]);
  assert_eq!(outcome(&summary, "intro"), Outcome::Success);
  assert_eq!(summary.successes(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_skip_all_runs_nothing() {
  let timeline = Timeline::new();
  let fragments = vec![
    Fragment::text("intro"),
    timeline.example("f1", 5),
    timeline.barrier("b", 5),
    timeline.example("f2", 5),
  ];
  let (ctx, shutdowns) = counted_context(ExecutionConfig {
    skip_all: true,
    ..config(2)
  });

  let summary = Scheduler::new(ctx).run(source(fragments)).summarize().await;

  assert!(summary.is_ok());
  assert_eq!(summary.fragments.len(), 4);
  assert_eq!(summary.skipped(), 4);
  assert_eq!(timeline.runs(), 0);
  assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batches_never_exceed_batch_size() {
  let ctx = ExecutionContext::new(config(2)).unwrap();
  let mut sequencer = Sequencer::new(ctx);
  let timeline = Timeline::new();

  let mut groups = Vec::new();
  for i in 0..5 {
    let emitted = sequencer.step(timeline.example(&format!("f{}", i), 1));
    if !emitted.is_empty() {
      groups.push(emitted.len());
    }
  }
  groups.push(sequencer.flush().len());

  assert_eq!(groups, vec![2, 2, 1]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_siblings_run_concurrently() {
  // Each sibling waits for the other; this only finishes if neither
  // depends on the other's completion.
  let rendezvous = Arc::new(tokio::sync::Barrier::new(2));
  let sibling = |name: &str| {
    let rendezvous = rendezvous.clone();
    Fragment::example(
      name,
      Execution::new(move || {
        let rendezvous = rendezvous.clone();
        async move {
          rendezvous.wait().await;
          Outcome::Success
        }
      })
      .with_timeout(Duration::from_secs(2)),
    )
  };

  let summary = run(config(2), vec![sibling("a"), sibling("b")]).await;

  assert_eq!(outcome(&summary, "a"), Outcome::Success);
  assert_eq!(outcome(&summary, "b"), Outcome::Success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_barrier_orders_surrounding_fragments() {
  let timeline = Timeline::new();
  let fragments = vec![
    timeline.example("f1", 60),
    timeline.example("f2", 40),
    timeline.barrier("f3", 150),
    timeline.example("f4", 10),
    timeline.example("f5", 10),
  ];

  let summary = run(config(2), fragments).await;
  assert!(summary.is_ok());
  assert_eq!(summary.descriptions(), vec!["f1", "f2", "f3", "f4", "f5"]);

  // f1 and f2 overlap.
  assert!(timeline.started("f2") < timeline.ended("f1"));
  // The barrier waits for both to complete.
  assert!(timeline.started("f3") >= timeline.ended("f1"));
  assert!(timeline.started("f3") >= timeline.ended("f2"));
  // Later fragments wait for the barrier to start, not to finish.
  assert!(timeline.started("f4") >= timeline.started("f3"));
  assert!(timeline.started("f5") >= timeline.started("f3"));
  assert!(timeline.started("f4") < timeline.ended("f3"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_barrier_waits_for_earlier_batches() {
  let timeline = Timeline::new();
  let fragments = vec![
    timeline.example("a1", 80),
    timeline.example("a2", 10),
    timeline.example("b1", 30),
    timeline.barrier("join", 5),
  ];

  run(config(2), fragments).await;

  for name in ["a1", "a2", "b1"] {
    assert!(timeline.started("join") >= timeline.ended(name), "{}", name);
  }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sequential_start_order() {
  let timeline = Timeline::new();
  let names = ["g1", "g2", "g3", "g4", "g5"];
  let fragments: Vec<_> = names
    .iter()
    .enumerate()
    .map(|(i, name)| timeline.example(name, 50 - i as u64 * 10))
    .collect();

  let summary = run(
    ExecutionConfig {
      sequential: true,
      ..config(4)
    },
    fragments,
  )
  .await;

  assert_eq!(summary.descriptions(), names.to_vec());
  for pair in names.windows(2) {
    assert!(timeline.started(pair[1]) >= timeline.started(pair[0]));
    assert!(timeline.started(pair[1]) >= timeline.ended(pair[0]));
  }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_pool_bounds_concurrency() {
  let timeline = Timeline::new();
  let fragments: Vec<_> = (0..6)
    .map(|i| timeline.example(&format!("f{}", i), 30))
    .collect();

  let summary = run(
    ExecutionConfig {
      max_concurrency: 2,
      ..config(6)
    },
    fragments,
  )
  .await;

  assert_eq!(summary.successes(), 6);
  assert!(timeline.peak() <= 2, "peak was {}", timeline.peak());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_events_bracket_the_run() {
  let timeline = Timeline::new();
  let (notifier, mut events) = ChannelNotifier::channel();
  let ctx = ExecutionContext::builder(config(2))
    .notifier(Arc::new(notifier))
    .build()
    .unwrap();

  let summary = Scheduler::new(ctx)
    .run(source(vec![
      timeline.example("f1", 5),
      timeline.example("f2", 5),
    ]))
    .summarize()
    .await;
  assert!(summary.is_ok());

  let mut received = Vec::new();
  while let Ok(event) = events.try_recv() {
    received.push(event);
  }

  assert!(matches!(
    received.first(),
    Some(ExecutionEvent::StreamStarted { .. })
  ));
  assert!(matches!(
    received.last(),
    Some(ExecutionEvent::StreamCompleted { fragments: 2, .. })
  ));
  let started = received
    .iter()
    .filter(|e| matches!(e, ExecutionEvent::FragmentStarted { .. }))
    .count();
  assert_eq!(started, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_known_skip_is_reported_without_running() {
  let timeline = Timeline::new();
  let fragments = vec![
    Fragment::example(
      "skipped",
      timeline.work("skipped", 5, Outcome::Success).skip("pending"),
    ),
    timeline.example("runs", 5),
  ];

  let summary = run(config(2), fragments).await;

  assert_eq!(outcome(&summary, "skipped"), Outcome::skipped("pending"));
  assert_eq!(outcome(&summary, "runs"), Outcome::Success);
  assert!(!timeline.ran("skipped"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_run_inline_is_serial() {
  let timeline = Timeline::new();
  let (ctx, shutdowns) = counted_context(config(4));
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = calls.clone();
  let origin = Fragment::example(
    "origin",
    timeline.work("origin", 5, Outcome::Success).with_continuation(move |_| {
      counter.fetch_add(1, Ordering::SeqCst);
      Some(source(vec![Fragment::text("spliced")]))
    }),
  );

  let summary = Scheduler::new(ctx)
    .run_inline(source(vec![
      timeline.example("a", 20),
      origin,
      timeline.example("b", 5),
    ]))
    .await;

  assert!(summary.is_ok());
  assert_eq!(summary.descriptions(), vec!["a", "origin", "spliced", "b"]);
  assert!(timeline.started("origin") >= timeline.ended("a"));
  assert!(timeline.started("b") >= timeline.ended("origin"));
  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}
