use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tessera_config::{ExecutionConfig, PlanDef};
use tessera_executor::{ExecutionContext, RunSummary, Scheduler, SchedulerError};
use tessera_fragment::{Fragment, FragmentKind, Outcome};

mod plan;

/// Tessera - streaming fragment scheduler
#[derive(Parser)]
#[command(name = "tessera")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a plan of synthetic fragments
  Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
  /// Path to the plan file (JSON)
  plan_file: PathBuf,

  /// Executable fragments started together
  #[arg(long)]
  batch_size: Option<usize>,

  /// Run one fragment at a time, each after the previous completes
  #[arg(long)]
  sequential: bool,

  /// Report every fragment as skipped without running it
  #[arg(long)]
  skip_all: bool,

  /// Default per-fragment timeout in milliseconds
  #[arg(long)]
  timeout_ms: Option<u64>,

  /// Size of the worker pool
  #[arg(long)]
  max_concurrency: Option<usize>,
}

impl RunArgs {
  /// Flags override whatever the environment configured.
  fn apply(&self, mut config: ExecutionConfig) -> ExecutionConfig {
    if let Some(batch_size) = self.batch_size {
      config.batch_size = batch_size;
    }
    if let Some(max_concurrency) = self.max_concurrency {
      config.max_concurrency = max_concurrency;
    }
    if self.timeout_ms.is_some() {
      config.timeout_ms = self.timeout_ms;
    }
    config.sequential |= self.sequential;
    config.skip_all |= self.skip_all;
    config
  }
}

/// One line of stdout per completed fragment.
#[derive(Serialize)]
struct FragmentReport<'a> {
  description: &'a str,
  kind: FragmentKind,
  #[serde(flatten)]
  outcome: &'a Outcome,
  duration_ms: u64,
}

impl<'a> FragmentReport<'a> {
  fn of(fragment: &'a Fragment, outcome: &'a Outcome, duration_ms: u64) -> Self {
    Self {
      description: fragment.description(),
      kind: fragment.kind(),
      outcome,
      duration_ms,
    }
  }
}

fn main() -> Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Run(args)) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_plan(args))
    }
    None => {
      println!("tessera - use --help to see available commands");
      Ok(ExitCode::SUCCESS)
    }
  }
}

async fn run_plan(args: RunArgs) -> Result<ExitCode> {
  let plan = PlanDef::load(&args.plan_file)
    .with_context(|| format!("failed to load plan file: {}", args.plan_file.display()))?;

  let config = ExecutionConfig::from_env().context("invalid environment configuration")?;
  let config = args.apply(config);
  config.validate().context("invalid configuration")?;

  info!(
    plan = plan.name.as_deref().unwrap_or("unnamed"),
    batch_size = config.batch_size,
    sequential = config.sequential,
    "plan_loaded"
  );
  eprintln!(
    "Loaded plan: {} ({} fragments)",
    plan.name.as_deref().unwrap_or("unnamed"),
    plan.total_fragments()
  );

  let cancel = CancellationToken::new();
  let interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      interrupt.cancel();
    }
  });

  let ctx = ExecutionContext::builder(config)
    .cancel_token(cancel)
    .on_shutdown(|| eprintln!("Run finished"))
    .build()
    .context("failed to create execution context")?;
  let run_id = ctx.run_id().to_string();

  let fragments = plan::build_fragments(&plan.fragments);
  let mut output = Scheduler::new(ctx).run(futures::stream::iter(fragments));

  let mut summary = RunSummary::default();
  while let Some(item) = output.next().await {
    match item {
      Ok(fragment) => {
        if let Some(result) = fragment.result() {
          let duration_ms = result.duration.as_millis() as u64;
          let report = FragmentReport::of(&fragment, &result.outcome, duration_ms);
          println!("{}", serde_json::to_string(&report)?);
        }
        summary.fragments.push(fragment);
      }
      Err(e) => summary.error = Some(e),
    }
  }

  eprintln!("Run {} completed", run_id);
  eprintln!(
    "Fragments: {} ({} passed, {} failed, {} skipped)",
    summary.fragments.len(),
    summary.successes(),
    summary.failures(),
    summary.skipped()
  );

  match summary.error {
    None => Ok(ExitCode::SUCCESS),
    Some(e @ SchedulerError::Fatal { .. }) | Some(e @ SchedulerError::Cancelled) => {
      eprintln!("Run stopped: {}", e);
      Ok(ExitCode::FAILURE)
    }
    Some(e) => Err(e).context("run failed"),
  }
}
