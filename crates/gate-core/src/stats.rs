//! Running counters over emitted decisions.

use serde::{Deserialize, Serialize};

use crate::decision::{AccessDecision, MatchStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
  pub total_attempts: u64,
  pub access_granted: u64,
  pub access_denied:  u64,
  pub both_verified:  u64,
  pub vehicle_only:   u64,
  pub identity_only:  u64,
  pub timeouts:       u64,
}

impl Stats {
  /// Count one emitted decision.
  pub fn record(&mut self, decision: &AccessDecision) {
    self.total_attempts += 1;
    if decision.is_granted() {
      self.access_granted += 1;
    } else {
      self.access_denied += 1;
    }
    match decision.status {
      MatchStatus::Matched => self.both_verified += 1,
      MatchStatus::VehicleOnly => self.vehicle_only += 1,
      MatchStatus::IdentityOnly => self.identity_only += 1,
      MatchStatus::Expired => self.timeouts += 1,
      MatchStatus::Incomplete | MatchStatus::Failed | MatchStatus::Flushed => {}
    }
  }
}
