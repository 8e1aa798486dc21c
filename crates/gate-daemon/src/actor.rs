//! The single task that owns the [`Gatekeeper`].
//!
//! Ingest sources send observations over an mpsc channel; the actor applies
//! them strictly in arrival order, sweeps on a timer in live mode, and
//! flushes every pending entry before it returns.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};
use gate_core::{
  gatekeeper::Gatekeeper, observation::Observation, sink::DecisionSink,
  stats::Stats,
};
use tokio::{sync::mpsc, time};
use tracing::{debug, info};

/// When the actor sweeps and what "now" means at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
  /// Sweep every `sweep_interval` of wall-clock time.
  Live { sweep_interval: Duration },
  /// Time is whatever the observations say; every observation sweeps as of
  /// its own timestamp and the final flush happens at the last one.
  Replay,
}

/// What the actor reports once its input is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
  pub stats:            Stats,
  pub started_at:       DateTime<Utc>,
  /// Pending entries left after the final flush.
  pub pending:          usize,
  /// Submits, sweeps and flushes whose persistence failed.
  pub persist_failures: usize,
  pub ended_at:         DateTime<Utc>,
}

/// Drive `gate` until the channel closes or `shutdown` resolves, then flush.
pub async fn run<S: DecisionSink>(
  mut gate: Gatekeeper<S>,
  mut rx: mpsc::Receiver<Observation>,
  clock: Clock,
  shutdown: impl Future<Output = ()>,
) -> RunSummary {
  let mut persist_failures = 0usize;
  let opened_at = Utc::now();
  let mut first_seen: Option<DateTime<Utc>> = None;
  let mut last_seen: Option<DateTime<Utc>> = None;

  let sweep_every = match clock {
    Clock::Live { sweep_interval } => sweep_interval.max(Duration::from_millis(1)),
    // The timer branch is disabled during replays.
    Clock::Replay => Duration::from_secs(1),
  };
  let mut ticker = time::interval(sweep_every);
  ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
  tokio::pin!(shutdown);

  info!(?clock, "gate open");
  loop {
    tokio::select! {
      received = rx.recv() => {
        let Some(observation) = received else {
          debug!("input exhausted");
          break;
        };
        first_seen.get_or_insert(observation.observed_at());
        last_seen = Some(observation.observed_at());
        if gate.submit(observation).await.is_err() {
          persist_failures += 1;
        }
      }
      _ = ticker.tick(), if clock != Clock::Replay => {
        if gate.tick(Utc::now()).await.is_err() {
          persist_failures += 1;
        }
      }
      () = &mut shutdown => {
        info!("shutdown requested");
        break;
      }
    }
  }

  let (started_at, ended_at) = match clock {
    Clock::Live { .. } => (opened_at, Utc::now()),
    Clock::Replay => (
      first_seen.unwrap_or(opened_at),
      last_seen.unwrap_or_else(Utc::now),
    ),
  };
  if gate.shutdown(ended_at).await.is_err() {
    persist_failures += 1;
  }

  let stats = gate.stats();
  info!(
    total = stats.total_attempts,
    granted = stats.access_granted,
    denied = stats.access_denied,
    timeouts = stats.timeouts,
    persist_failures,
    "gate closed"
  );

  RunSummary {
    stats,
    started_at,
    pending: gate.matcher().pending_len(),
    persist_failures,
    ended_at,
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use chrono::{TimeDelta, TimeZone};
  use gate_core::{
    decision::{AccessDecision, DenialReason, MatchStatus},
    matcher::Matcher,
    observation::{IdentityObservation, VehicleObservation},
    policy::MatcherConfig,
  };
  use thiserror::Error;

  use super::*;

  #[derive(Debug, Error)]
  #[error("sink offline")]
  struct Offline;

  #[derive(Default)]
  struct Recorder {
    decisions: Mutex<Vec<AccessDecision>>,
    offline:   bool,
  }

  impl DecisionSink for &Recorder {
    type Error = Offline;

    async fn append_decision(&self, d: &AccessDecision) -> Result<(), Offline> {
      if self.offline {
        return Err(Offline);
      }
      self.decisions.lock().unwrap().push(d.clone());
      Ok(())
    }

    async fn append_alert(&self, _d: &AccessDecision) -> Result<(), Offline> { Ok(()) }
  }

  fn t(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + TimeDelta::seconds(secs)
  }

  fn gate(sink: &Recorder) -> Gatekeeper<&Recorder> {
    Gatekeeper::new(Matcher::new(MatcherConfig::default()), sink, true)
  }

  #[tokio::test]
  async fn replay_processes_in_order_and_flushes_at_last_time() {
    let sink = Recorder::default();
    let (tx, rx) = mpsc::channel::<Observation>(8);

    tx.send(VehicleObservation::new("MH12AB1234", 0.9, t(0)).unwrap().into())
      .await
      .unwrap();
    tx.send(
      IdentityObservation::new("20230001", Some("JOHN SMITH"), 0.8, t(10))
        .unwrap()
        .into(),
    )
    .await
    .unwrap();
    tx.send(VehicleObservation::new("KA05M9999", 0.9, t(20)).unwrap().into())
      .await
      .unwrap();
    drop(tx);

    let summary =
      run(gate(&sink), rx, Clock::Replay, std::future::pending()).await;

    assert_eq!(summary.started_at, t(0));
    assert_eq!(summary.ended_at, t(20));
    assert_eq!(summary.pending, 0);
    assert_eq!(summary.stats.total_attempts, 2);
    assert_eq!(summary.stats.access_granted, 1);

    let decisions = sink.decisions.lock().unwrap();
    assert_eq!(decisions[0].status, MatchStatus::Matched);
    assert_eq!(decisions[1].status, MatchStatus::Flushed);
    assert_eq!(decisions[1].reason, Some(DenialReason::Shutdown));
    assert_eq!(decisions[1].timestamp, t(20));
  }

  #[tokio::test]
  async fn shutdown_signal_stops_a_live_gate() {
    let sink = Recorder::default();
    let (tx, rx) = mpsc::channel::<Observation>(8);
    tx.send(VehicleObservation::new("MH12AB1234", 0.9, Utc::now()).unwrap().into())
      .await
      .unwrap();

    let clock = Clock::Live { sweep_interval: Duration::from_millis(10) };
    let stop = time::sleep(Duration::from_millis(50));
    let summary = run(gate(&sink), rx, clock, stop).await;

    assert_eq!(summary.pending, 0);
    assert_eq!(summary.stats.total_attempts, 1);
    let decisions = sink.decisions.lock().unwrap();
    assert_eq!(decisions.len(), 1, "pending vehicle flushed on shutdown");
    assert_eq!(decisions[0].status, MatchStatus::Flushed);
    drop(tx);
  }

  #[tokio::test]
  async fn persistence_failures_are_counted_not_fatal() {
    let sink = Recorder { offline: true, ..Recorder::default() };
    let (tx, rx) = mpsc::channel::<Observation>(8);
    tx.send(VehicleObservation::new("MH12AB1234", 0.9, t(0)).unwrap().into())
      .await
      .unwrap();
    tx.send(VehicleObservation::new("KA05M9999", 0.9, t(40)).unwrap().into())
      .await
      .unwrap();
    drop(tx);

    let summary =
      run(gate(&sink), rx, Clock::Replay, std::future::pending()).await;

    // t=40 expires the first vehicle; the flush closes the second.
    assert_eq!(summary.stats.total_attempts, 2);
    assert_eq!(summary.persist_failures, 2);
  }
}
