//! The verification matcher.
//!
//! Holds one-sided observations until their counterpart arrives and turns
//! every pending entry into exactly one [`AccessDecision`]:
//!
//! ```text
//!   absent ──observe──▶ pending ──counterpart──▶ matched
//!                          │
//!                          └──── age > window ──▶ expired (denied: timeout)
//! ```
//!
//! The matcher is plain single-owner bookkeeping. Callers that feed it from
//! several sources must serialise access (see `Gatekeeper`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::{
  decision::{AccessDecision, Decision, DenialReason, MatchStatus},
  observation::{
    IdentityObservation, Observation, ObservationKind, PendingKey,
    VehicleObservation,
  },
  policy::{MatcherConfig, Pairing, evaluate},
  registry::VehicleRegistry,
  stats::Stats,
};

// ─── Pending entries ─────────────────────────────────────────────────────────

/// A one-sided observation waiting for its counterpart.
#[derive(Debug, Clone)]
pub struct PendingEntry {
  pub key:         PendingKey,
  pub kind:        ObservationKind,
  pub observation: Observation,
  /// When the entry was first created. Refreshing the observation for the
  /// same key does not move this.
  pub created_at:  DateTime<Utc>,
  /// Arrival order; breaks ties between equal `created_at` values.
  seq:             u64,
}

impl PendingEntry {
  /// The instant after which the entry counts as expired.
  pub fn deadline(&self, config: &MatcherConfig) -> DateTime<Utc> {
    self
      .created_at
      .checked_add_signed(config.window())
      .unwrap_or(DateTime::<Utc>::MAX_UTC)
  }

  fn is_expired(&self, now: DateTime<Utc>, config: &MatcherConfig) -> bool {
    now > self.deadline(config)
  }
}

// ─── Matcher ─────────────────────────────────────────────────────────────────

pub struct Matcher {
  config:   MatcherConfig,
  registry: VehicleRegistry,
  pending:  HashMap<PendingKey, PendingEntry>,
  next_seq: u64,
  stats:    Stats,
}

impl Matcher {
  pub fn new(config: MatcherConfig) -> Self {
    Self {
      config,
      registry: VehicleRegistry::new(),
      pending: HashMap::new(),
      next_seq: 0,
      stats: Stats::default(),
    }
  }

  /// Attach the vehicle registry consulted under [`Pairing::Registered`].
  pub fn with_registry(mut self, registry: VehicleRegistry) -> Self {
    self.registry = registry;
    self
  }

  pub fn config(&self) -> &MatcherConfig { &self.config }

  pub fn stats(&self) -> Stats { self.stats }

  pub fn pending_len(&self) -> usize { self.pending.len() }

  /// Pending entries in creation order.
  pub fn pending(&self) -> Vec<&PendingEntry> {
    let mut entries: Vec<&PendingEntry> = self.pending.values().collect();
    entries.sort_by_key(|e| (e.created_at, e.seq));
    entries
  }

  /// Feed one observation.
  ///
  /// Expired entries are swept first (as of the observation's timestamp), so
  /// the returned decisions are any timeouts followed by at most one match.
  pub fn observe(&mut self, observation: Observation) -> Vec<AccessDecision> {
    let now = observation.observed_at();
    let mut decisions = self.sweep(now);

    let counterpart = self
      .find_counterpart(&observation)
      .and_then(|key| self.pending.remove(&key));
    if let Some(entry) = counterpart {
      debug!(pending = %entry.key, incoming = %observation.key(), "matched");
      let (vehicle, identity) = sides([entry.observation, observation]);
      decisions.push(self.conclude(vehicle, identity, now));
      return decisions;
    }

    self.hold(observation);
    decisions
  }

  /// Expire every entry whose age exceeds the window as of `now`.
  ///
  /// Each expired entry yields one denied decision with reason `timeout`,
  /// stamped at the entry's deadline. A second sweep at the same instant
  /// yields nothing.
  pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<AccessDecision> {
    let expired: Vec<PendingKey> = self
      .pending
      .values()
      .filter(|e| e.is_expired(now, &self.config))
      .map(|e| e.key.clone())
      .collect();
    self.take_in_creation_order(expired, |matcher, entry| {
      debug!(pending = %entry.key, "expired");
      let at = entry.deadline(&matcher.config);
      matcher.close(entry, at, MatchStatus::Expired, DenialReason::Timeout)
    })
  }

  /// Sweep, then close every remaining entry as denied. Used at shutdown so
  /// no observation leaves the gate without an auditable decision.
  pub fn flush(&mut self, now: DateTime<Utc>) -> Vec<AccessDecision> {
    let mut decisions = self.sweep(now);
    let remaining: Vec<PendingKey> = self.pending.keys().cloned().collect();
    decisions.extend(self.take_in_creation_order(
      remaining,
      |matcher, entry| {
        matcher.close(entry, now, MatchStatus::Flushed, DenialReason::Shutdown)
      },
    ));
    decisions
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  /// The earliest-created compatible pending entry of the counterpart kind.
  fn find_counterpart(&self, observation: &Observation) -> Option<PendingKey> {
    let wanted = observation.kind().counterpart();
    self
      .pending
      .values()
      .filter(|e| e.kind == wanted)
      .filter(|e| self.compatible(&e.observation, observation))
      .min_by_key(|e| (e.created_at, e.seq))
      .map(|e| e.key.clone())
  }

  fn compatible(&self, a: &Observation, b: &Observation) -> bool {
    match self.config.pairing {
      Pairing::Any => true,
      Pairing::Registered => match (a, b) {
        (Observation::Vehicle(v), Observation::Identity(i))
        | (Observation::Identity(i), Observation::Vehicle(v)) => {
          self.registry.is_owner(&v.plate, &i.subject_id)
        }
        _ => false,
      },
    }
  }

  /// Store a new pending entry, or refresh the observation of the entry
  /// already held under the same key.
  fn hold(&mut self, observation: Observation) {
    let key = observation.key();
    if let Some(entry) = self.pending.get_mut(&key) {
      debug!(pending = %key, "refreshed");
      entry.observation = observation;
      return;
    }

    debug!(pending = %key, "waiting for counterpart");
    let entry = PendingEntry {
      key: key.clone(),
      kind: observation.kind(),
      created_at: observation.observed_at(),
      observation,
      seq: self.next_seq,
    };
    self.next_seq += 1;
    self.pending.insert(key, entry);
  }

  fn take_in_creation_order<F>(
    &mut self,
    keys: Vec<PendingKey>,
    mut close: F,
  ) -> Vec<AccessDecision>
  where
    F: FnMut(&mut Self, PendingEntry) -> AccessDecision,
  {
    let mut entries: Vec<PendingEntry> =
      keys.iter().filter_map(|k| self.pending.remove(k)).collect();
    entries.sort_by_key(|e| (e.created_at, e.seq));
    entries.into_iter().map(|e| close(self, e)).collect()
  }

  fn close(
    &mut self,
    entry: PendingEntry,
    at: DateTime<Utc>,
    status: MatchStatus,
    reason: DenialReason,
  ) -> AccessDecision {
    let (vehicle, identity) = sides([entry.observation]);
    self.record(AccessDecision {
      decision_id: Uuid::new_v4(),
      timestamp: at,
      vehicle,
      identity,
      decision: Decision::Denied,
      status,
      reason: Some(reason),
    })
  }

  fn conclude(
    &mut self,
    vehicle: Option<VehicleObservation>,
    identity: Option<IdentityObservation>,
    at: DateTime<Utc>,
  ) -> AccessDecision {
    let verdict = evaluate(&self.config, vehicle.as_ref(), identity.as_ref());
    self.record(AccessDecision {
      decision_id: Uuid::new_v4(),
      timestamp: at,
      vehicle,
      identity,
      decision: verdict.decision,
      status: verdict.status,
      reason: verdict.reason,
    })
  }

  fn record(&mut self, decision: AccessDecision) -> AccessDecision {
    self.stats.record(&decision);
    decision
  }
}

/// Split observations into their vehicle and identity sides.
fn sides<const N: usize>(
  observations: [Observation; N],
) -> (Option<VehicleObservation>, Option<IdentityObservation>) {
  let mut vehicle = None;
  let mut identity = None;
  for observation in observations {
    match observation {
      Observation::Vehicle(v) => vehicle = Some(v),
      Observation::Identity(i) => identity = Some(i),
    }
  }
  (vehicle, identity)
}
