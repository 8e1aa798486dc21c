//! Access decisions: the terminal, immutable record of an access attempt.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::observation::{IdentityObservation, VehicleObservation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
  Granted,
  Denied,
}

/// How the decision came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
  /// Both sides present and valid.
  Matched,
  /// Either-sufficient mode granted on the vehicle side alone.
  VehicleOnly,
  /// Either-sufficient mode granted on the identity side alone.
  IdentityOnly,
  /// Both-required mode with a missing or invalid side.
  Incomplete,
  /// No valid side at all.
  Failed,
  /// The counterpart never arrived within the window.
  Expired,
  /// Still pending when the gate shut down.
  Flushed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialReason {
  #[serde(rename = "both required")]
  BothRequired,
  #[serde(rename = "no valid identification")]
  NoValidIdentification,
  #[serde(rename = "timeout")]
  Timeout,
  #[serde(rename = "shutdown")]
  Shutdown,
}

impl DenialReason {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::BothRequired => "both required",
      Self::NoValidIdentification => "no valid identification",
      Self::Timeout => "timeout",
      Self::Shutdown => "shutdown",
    }
  }
}

impl fmt::Display for DenialReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Created exactly once per matched, expired or flushed pending entry and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessDecision {
  pub decision_id: Uuid,
  pub timestamp:   DateTime<Utc>,
  pub vehicle:     Option<VehicleObservation>,
  pub identity:    Option<IdentityObservation>,
  pub decision:    Decision,
  pub status:      MatchStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reason:      Option<DenialReason>,
}

impl AccessDecision {
  pub fn is_granted(&self) -> bool { self.decision == Decision::Granted }

  /// One-line human-readable description, used by logs and alert files.
  pub fn summary(&self) -> String {
    let mut parts = Vec::new();
    if let Some(identity) = &self.identity {
      match &identity.name {
        Some(name) => parts.push(format!("ID {} ({name})", identity.subject_id)),
        None => parts.push(format!("ID {}", identity.subject_id)),
      }
    }
    if let Some(vehicle) = &self.vehicle {
      parts.push(format!("vehicle {}", vehicle.plate));
    }
    let who = if parts.is_empty() {
      "nobody".to_owned()
    } else {
      parts.join(" | ")
    };
    match (self.decision, self.reason) {
      (Decision::Granted, _) => format!("granted: {who}"),
      (Decision::Denied, Some(reason)) => format!("denied ({reason}): {who}"),
      (Decision::Denied, None) => format!("denied: {who}"),
    }
  }
}
