//! Matcher configuration and the access policy.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::{
  decision::{Decision, DenialReason, MatchStatus},
  observation::{IdentityObservation, VehicleObservation},
};

/// Which vehicle/identity pairs the matcher may combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pairing {
  /// Any pending counterpart is compatible.
  #[default]
  Any,
  /// Only a plate registered to the presented subject is compatible.
  Registered,
}

/// Explicit matcher configuration; one instance per matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
  /// Both sides must be present and valid for a grant.
  pub require_both:            bool,
  /// How long a one-sided observation waits for its counterpart.
  pub match_window_seconds:    u64,
  pub min_plate_confidence:    f32,
  pub min_identity_confidence: f32,
  pub pairing:                 Pairing,
}

impl Default for MatcherConfig {
  fn default() -> Self {
    Self {
      require_both:            true,
      match_window_seconds:    30,
      min_plate_confidence:    0.7,
      min_identity_confidence: 0.6,
      pairing:                 Pairing::Any,
    }
  }
}

impl MatcherConfig {
  pub fn window(&self) -> TimeDelta {
    i64::try_from(self.match_window_seconds)
      .ok()
      .and_then(TimeDelta::try_seconds)
      .unwrap_or(TimeDelta::MAX)
  }

  pub fn vehicle_valid(&self, vehicle: Option<&VehicleObservation>) -> bool {
    vehicle.is_some_and(|v| v.confidence >= self.min_plate_confidence)
  }

  pub fn identity_valid(&self, identity: Option<&IdentityObservation>) -> bool {
    identity.is_some_and(|i| i.confidence >= self.min_identity_confidence)
  }
}

/// The outcome of applying the policy to a (possibly one-sided) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
  pub decision: Decision,
  pub status:   MatchStatus,
  pub reason:   Option<DenialReason>,
}

impl Verdict {
  fn granted(status: MatchStatus) -> Self {
    Self { decision: Decision::Granted, status, reason: None }
  }

  fn denied(status: MatchStatus, reason: DenialReason) -> Self {
    Self { decision: Decision::Denied, status, reason: Some(reason) }
  }
}

/// Apply the configured policy to a pair of sides.
///
/// - both-required: granted iff both sides are present and valid.
/// - either-sufficient: granted iff at least one side is valid.
pub fn evaluate(
  config: &MatcherConfig,
  vehicle: Option<&VehicleObservation>,
  identity: Option<&IdentityObservation>,
) -> Verdict {
  let vehicle_ok = config.vehicle_valid(vehicle);
  let identity_ok = config.identity_valid(identity);

  match (config.require_both, vehicle_ok, identity_ok) {
    (_, true, true) => Verdict::granted(MatchStatus::Matched),
    (true, _, _) => {
      Verdict::denied(MatchStatus::Incomplete, DenialReason::BothRequired)
    }
    (false, true, false) => Verdict::granted(MatchStatus::VehicleOnly),
    (false, false, true) => Verdict::granted(MatchStatus::IdentityOnly),
    (false, false, false) => {
      Verdict::denied(MatchStatus::Failed, DenialReason::NoValidIdentification)
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;

  fn vehicle(confidence: f32) -> VehicleObservation {
    let at = Utc.timestamp_opt(0, 0).unwrap();
    VehicleObservation::new("MH12AB1234", confidence, at).unwrap()
  }

  fn identity(confidence: f32) -> IdentityObservation {
    let at = Utc.timestamp_opt(0, 0).unwrap();
    IdentityObservation::new("20230001", Some("JOHN SMITH"), confidence, at)
      .unwrap()
  }

  fn both_required() -> MatcherConfig { MatcherConfig::default() }

  fn either_sufficient() -> MatcherConfig {
    MatcherConfig { require_both: false, ..MatcherConfig::default() }
  }

  #[test]
  fn both_required_grants_only_complete_pairs() {
    let cfg = both_required();
    let v = vehicle(0.9);
    let i = identity(0.9);

    let verdict = evaluate(&cfg, Some(&v), Some(&i));
    assert_eq!(verdict.decision, Decision::Granted);
    assert_eq!(verdict.status, MatchStatus::Matched);

    let verdict = evaluate(&cfg, Some(&v), None);
    assert_eq!(verdict.decision, Decision::Denied);
    assert_eq!(verdict.reason, Some(DenialReason::BothRequired));

    let verdict = evaluate(&cfg, None, Some(&i));
    assert_eq!(verdict.decision, Decision::Denied);
    assert_eq!(verdict.reason, Some(DenialReason::BothRequired));
  }

  #[test]
  fn both_required_rejects_low_confidence_side() {
    let verdict =
      evaluate(&both_required(), Some(&vehicle(0.5)), Some(&identity(0.9)));
    assert_eq!(verdict.decision, Decision::Denied);
    assert_eq!(verdict.status, MatchStatus::Incomplete);
  }

  #[test]
  fn either_sufficient_grants_on_one_valid_side() {
    let cfg = either_sufficient();
    let v = vehicle(0.9);

    let verdict = evaluate(&cfg, Some(&v), None);
    assert_eq!(verdict.decision, Decision::Granted);
    assert_eq!(verdict.status, MatchStatus::VehicleOnly);

    let verdict = evaluate(&cfg, Some(&vehicle(0.1)), Some(&identity(0.9)));
    assert_eq!(verdict.status, MatchStatus::IdentityOnly);

    let verdict = evaluate(&cfg, None, None);
    assert_eq!(verdict.decision, Decision::Denied);
    assert_eq!(verdict.reason, Some(DenialReason::NoValidIdentification));
  }

  #[test]
  fn thresholds_are_inclusive() {
    let cfg = both_required();
    assert!(cfg.vehicle_valid(Some(&vehicle(0.7))));
    assert!(cfg.identity_valid(Some(&identity(0.6))));
    assert!(!cfg.identity_valid(None));
  }

  #[test]
  fn window_saturates_instead_of_overflowing() {
    let cfg = MatcherConfig {
      match_window_seconds: u64::MAX,
      ..MatcherConfig::default()
    };
    assert_eq!(cfg.window(), TimeDelta::MAX);
    assert_eq!(both_required().window(), TimeDelta::seconds(30));
  }
}
