//! gatekeeper binary.
//!
//! Reads `gatekeeper.toml` (or the path given with `--config`), opens the
//! SQLite decision log and the journal directory, and then either runs the
//! gate over a JSON Lines event stream or queries what earlier runs
//! recorded.
//!
//! ```text
//! detector | gatekeeper run
//! gatekeeper run --input session.jsonl --replay
//! gatekeeper decisions --limit 50
//! gatekeeper register-vehicle "MH 12 AB 1234" 20230001
//! ```

use std::{path::PathBuf, time::Duration};

use anyhow::{Context as _, anyhow};
use clap::{Parser, Subcommand};
use gate_core::{
  gatekeeper::Gatekeeper, matcher::Matcher, observation::Observation,
  policy::Pairing,
};
use gate_daemon::{
  GateConfig,
  actor::{self, Clock},
  feed,
  ingest::{Ingestor, Timing},
  sink::GateSink,
};
use gate_extract::{RemoteRecognizer, normalize_plate};
use gate_journal::{JournalSink, SessionReport};
use gate_store_sqlite::SqliteDecisionLog;
use tokio::sync::mpsc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Campus gate access verification")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "gatekeeper.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Run the gate over JSON Lines events from a file or stdin.
  Run {
    /// Read events from this file instead of stdin.
    #[arg(short, long)]
    input:  Option<PathBuf>,
    /// Use each event's recorded `observed_at` instead of the wall clock.
    #[arg(long)]
    replay: bool,
  },
  /// Print recorded decisions as JSON lines, newest first.
  Decisions {
    #[arg(short, long, default_value_t = 20)]
    limit:  u32,
    #[arg(long, default_value_t = 0)]
    offset: u32,
  },
  /// Print raised alerts, newest first.
  Alerts {
    #[arg(short, long, default_value_t = 20)]
    limit: u32,
  },
  /// Record that a plate belongs to a subject.
  RegisterVehicle { plate: String, subject: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let cfg = GateConfig::load(&cli.config)
    .with_context(|| format!("failed to load config from {:?}", cli.config))?;

  if let Some(parent) = cfg.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteDecisionLog::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  match cli.command {
    Command::Run { input, replay } => run(cfg, store, input, replay).await,
    Command::Decisions { limit, offset } => {
      for decision in store.list_decisions(limit, offset).await? {
        println!("{}", serde_json::to_string(&decision)?);
      }
      Ok(())
    }
    Command::Alerts { limit } => {
      for alert in store.list_alerts(limit).await? {
        println!("{}  {}", alert.raised_at.to_rfc3339(), alert.message);
      }
      Ok(())
    }
    Command::RegisterVehicle { plate, subject } => {
      let normalized = normalize_plate(&plate)
        .ok_or_else(|| anyhow!("{plate:?} is not a recognisable plate"))?;
      let subject = subject.trim();
      if subject.is_empty() {
        return Err(anyhow!("subject id must not be empty"));
      }
      let vehicle = store.register_vehicle(&normalized.plate, subject).await?;
      println!("{} -> {}", normalized.display, vehicle.owner_subject_id);
      Ok(())
    }
  }
}

async fn run(
  cfg: GateConfig,
  store: SqliteDecisionLog,
  input: Option<PathBuf>,
  replay: bool,
) -> anyhow::Result<()> {
  let journal = JournalSink::open(&cfg.journal_dir)
    .await
    .with_context(|| format!("failed to open journal at {:?}", cfg.journal_dir))?;

  let mut matcher = Matcher::new(cfg.matcher.clone());
  if cfg.matcher.pairing == Pairing::Registered {
    let registry = store.load_registry().await?;
    info!(vehicles = registry.len(), "vehicle registry loaded");
    matcher = matcher.with_registry(registry);
  }
  let gate = Gatekeeper::new(
    matcher,
    GateSink::new(store, journal.clone()),
    cfg.alerts_enabled,
  );

  let recognizer = cfg
    .recognizer_url
    .as_deref()
    .map(|url| {
      RemoteRecognizer::new(url, Duration::from_secs(cfg.recognizer_timeout_secs))
    })
    .transpose()
    .context("invalid recognizer_url")?;
  let timing = if replay { Timing::Replay } else { Timing::Live };
  let ingestor = Ingestor::new(cfg.extract.clone(), recognizer, timing);

  let lines = feed::spawn_lines(input.as_deref()).await?;
  let (tx, rx) = mpsc::channel::<Observation>(64);
  let feeder = tokio::spawn(feed::feed(lines, ingestor, tx));

  let clock = if replay {
    Clock::Replay
  } else {
    Clock::Live { sweep_interval: Duration::from_millis(cfg.sweep_interval_ms) }
  };
  let summary = actor::run(gate, rx, clock, ctrl_c()).await;

  if feeder.is_finished() {
    match feeder.await {
      Ok(Ok(lines)) => info!(lines, "input closed"),
      Ok(Err(e)) => warn!(error = %format!("{e:#}"), "input failed"),
      Err(e) => warn!(error = %e, "input task failed"),
    }
  } else {
    feeder.abort();
  }

  let report = SessionReport {
    session_started:       summary.started_at,
    session_ended:         summary.ended_at,
    statistics:            summary.stats,
    pending_verifications: summary.pending,
    total_access_logs:     journal.total_records().await?,
  };
  let path = report
    .write_to(&cfg.journal_dir)
    .await
    .context("failed to write session report")?;
  println!("{}", path.display());

  if summary.persist_failures > 0 {
    warn!(
      failures = summary.persist_failures,
      "some decisions were not fully persisted"
    );
  }
  Ok(())
}

async fn ctrl_c() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "cannot listen for ctrl-c");
    std::future::pending::<()>().await;
  }
}
