use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tessera_config::{FragmentDef, KindDef, OutcomeDef};
use tessera_fragment::{Execution, Fragment, FragmentKind, Outcome};

/// Turn plan definitions into fragments backed by synthetic computations.
pub fn build_fragments(defs: &[FragmentDef]) -> Vec<Fragment> {
  defs.iter().map(build_fragment).collect()
}

fn build_fragment(def: &FragmentDef) -> Fragment {
  let kind = match def.kind {
    KindDef::Text => return Fragment::text(def.description.clone()),
    KindDef::Example => FragmentKind::Example,
    KindDef::Action => FragmentKind::Action,
    KindDef::Barrier => FragmentKind::Barrier,
  };

  let delay = Duration::from_millis(def.delay_ms);
  let outcome = outcome_of(def);
  let mut execution = Execution::new(move || {
    let outcome = outcome.clone();
    async move {
      if !delay.is_zero() {
        tokio::time::sleep(delay).await;
      }
      outcome
    }
  });

  if let Some(ms) = def.timeout_ms {
    execution = execution.with_timeout(Duration::from_millis(ms));
  }
  if let Some(reason) = &def.skip {
    execution = execution.skip(reason.clone());
  }
  if !def.then.is_empty() {
    let then = Arc::new(def.then.clone());
    execution = execution.with_continuation(move |result| {
      result
        .outcome
        .is_success()
        .then(|| futures::stream::iter(build_fragments(&then)).boxed())
    });
  }

  Fragment::new(kind, def.description.clone(), execution)
}

fn outcome_of(def: &FragmentDef) -> Outcome {
  let message = || {
    def
      .message
      .clone()
      .unwrap_or_else(|| format!("{} did not pass", def.description))
  };
  match def.outcome {
    OutcomeDef::Success => Outcome::Success,
    OutcomeDef::Failure => Outcome::failure(message()),
    OutcomeDef::Error => Outcome::error(message()),
  }
}

#[cfg(test)]
mod tests {
  use std::time::Instant;

  use tessera_config::PlanDef;
  use tessera_fragment::ExecutionResult;

  use super::*;

  const PLAN: &str = r#"{
    "name": "checkout",
    "fragments": [
      { "kind": "text", "description": "Checkout" },
      { "description": "adds items", "delay_ms": 5 },
      {
        "kind": "barrier",
        "description": "logs in",
        "outcome": "failure",
        "message": "bad password",
        "timeout_ms": 100
      },
      { "kind": "action", "description": "cleanup", "skip": "disabled" },
      {
        "description": "pays",
        "then": [{ "description": "sends receipt" }]
      }
    ]
  }"#;

  fn fragments() -> Vec<Fragment> {
    build_fragments(&PlanDef::from_json(PLAN).unwrap().fragments)
  }

  #[test]
  fn test_build_maps_kinds() {
    let kinds: Vec<_> = fragments().iter().map(Fragment::kind).collect();
    assert_eq!(
      kinds,
      vec![
        FragmentKind::Text,
        FragmentKind::Example,
        FragmentKind::Barrier,
        FragmentKind::Action,
        FragmentKind::Example,
      ]
    );
  }

  #[test]
  fn test_build_carries_timeout_and_skip() {
    let fragments = fragments();
    assert_eq!(
      fragments[2].execution().timeout(),
      Some(Duration::from_millis(100))
    );
    assert_eq!(fragments[3].execution().skip_reason(), Some("disabled"));
    assert!(fragments[0].execution().body().is_none());
  }

  #[tokio::test]
  async fn test_body_returns_configured_outcome() {
    let fragments = fragments();
    let body = fragments[2].execution().body().unwrap();
    assert_eq!(body().await, Outcome::failure("bad password"));
  }

  #[tokio::test]
  async fn test_continuation_only_follows_success() {
    let fragments = fragments();
    let pays = fragments[4].execution();

    let passed = ExecutionResult::new(Outcome::Success, Instant::now(), false);
    let spliced: Vec<_> = pays.continue_with(&passed).unwrap().collect().await;
    assert_eq!(spliced.len(), 1);
    assert_eq!(spliced[0].description(), "sends receipt");

    let failed = ExecutionResult::new(Outcome::failure("declined"), Instant::now(), false);
    assert!(pays.continue_with(&failed).is_none());
  }

  #[test]
  fn test_default_failure_message() {
    let def = FragmentDef {
      outcome: OutcomeDef::Error,
      ..PlanDef::from_json(PLAN).unwrap().fragments[1].clone()
    };
    assert_eq!(outcome_of(&def), Outcome::error("adds items did not pass"));
  }
}
