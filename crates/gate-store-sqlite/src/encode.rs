//! Encoding and decoding helpers between gate domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings with a fixed nanosecond width, so string
//! order is time order. Observations are stored as compact JSON. UUIDs are
//! hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use gate_core::decision::{AccessDecision, Decision, DenialReason, MatchStatus};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Decision ────────────────────────────────────────────────────────────────

pub fn encode_decision(d: Decision) -> &'static str {
  match d {
    Decision::Granted => "granted",
    Decision::Denied => "denied",
  }
}

pub fn decode_decision(s: &str) -> Result<Decision> {
  match s {
    "granted" => Ok(Decision::Granted),
    "denied" => Ok(Decision::Denied),
    other => Err(unknown("decision", other)),
  }
}

// ─── MatchStatus ─────────────────────────────────────────────────────────────

pub fn encode_status(s: MatchStatus) -> &'static str {
  match s {
    MatchStatus::Matched => "matched",
    MatchStatus::VehicleOnly => "vehicle_only",
    MatchStatus::IdentityOnly => "identity_only",
    MatchStatus::Incomplete => "incomplete",
    MatchStatus::Failed => "failed",
    MatchStatus::Expired => "expired",
    MatchStatus::Flushed => "flushed",
  }
}

pub fn decode_status(s: &str) -> Result<MatchStatus> {
  match s {
    "matched" => Ok(MatchStatus::Matched),
    "vehicle_only" => Ok(MatchStatus::VehicleOnly),
    "identity_only" => Ok(MatchStatus::IdentityOnly),
    "incomplete" => Ok(MatchStatus::Incomplete),
    "failed" => Ok(MatchStatus::Failed),
    "expired" => Ok(MatchStatus::Expired),
    "flushed" => Ok(MatchStatus::Flushed),
    other => Err(unknown("status", other)),
  }
}

// ─── DenialReason ────────────────────────────────────────────────────────────

pub fn decode_reason(s: &str) -> Result<DenialReason> {
  [
    DenialReason::BothRequired,
    DenialReason::NoValidIdentification,
    DenialReason::Timeout,
    DenialReason::Shutdown,
  ]
  .into_iter()
  .find(|r| r.as_str() == s)
  .ok_or_else(|| unknown("reason", s))
}

fn unknown(column: &'static str, value: &str) -> Error {
  Error::UnknownValue { column, value: value.to_owned() }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column values for one `access_decisions` row, ready to bind.
pub struct DecisionRow {
  pub decision_id:   String,
  pub timestamp:     String,
  pub decision:      &'static str,
  pub status:        &'static str,
  pub reason:        Option<&'static str>,
  pub plate:         Option<String>,
  pub subject_id:    Option<String>,
  pub vehicle_json:  Option<String>,
  pub identity_json: Option<String>,
}

impl DecisionRow {
  pub fn encode(d: &AccessDecision) -> Result<Self> {
    Ok(Self {
      decision_id:   encode_uuid(d.decision_id),
      timestamp:     encode_dt(d.timestamp),
      decision:      encode_decision(d.decision),
      status:        encode_status(d.status),
      reason:        d.reason.map(DenialReason::as_str),
      plate:         d.vehicle.as_ref().map(|v| v.plate.clone()),
      subject_id:    d.identity.as_ref().map(|i| i.subject_id.clone()),
      vehicle_json:  d.vehicle.as_ref().map(serde_json::to_string).transpose()?,
      identity_json: d
        .identity
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?,
    })
  }
}

/// Raw strings read directly from an `access_decisions` row.
pub struct RawDecision {
  pub decision_id:   String,
  pub timestamp:     String,
  pub decision:      String,
  pub status:        String,
  pub reason:        Option<String>,
  pub vehicle_json:  Option<String>,
  pub identity_json: Option<String>,
}

impl RawDecision {
  /// Column list matching [`RawDecision::from_row`].
  pub const COLUMNS: &'static str = "decision_id, timestamp, decision, status, \
                                     reason, vehicle_json, identity_json";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      decision_id:   row.get(0)?,
      timestamp:     row.get(1)?,
      decision:      row.get(2)?,
      status:        row.get(3)?,
      reason:        row.get(4)?,
      vehicle_json:  row.get(5)?,
      identity_json: row.get(6)?,
    })
  }

  pub fn into_decision(self) -> Result<AccessDecision> {
    Ok(AccessDecision {
      decision_id: decode_uuid(&self.decision_id)?,
      timestamp:   decode_dt(&self.timestamp)?,
      vehicle:     self
        .vehicle_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
      identity:    self
        .identity_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
      decision:    decode_decision(&self.decision)?,
      status:      decode_status(&self.status)?,
      reason:      self.reason.as_deref().map(decode_reason).transpose()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_as_strings() {
    let whole = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let later = Utc.timestamp_opt(1_700_000_000, 5).unwrap();
    assert!(encode_dt(whole) < encode_dt(later));
    assert_eq!(decode_dt(&encode_dt(later)).unwrap(), later);
  }

  #[test]
  fn unknown_enum_values_are_reported() {
    assert!(matches!(
      decode_status("partial"),
      Err(Error::UnknownValue { column: "status", .. })
    ));
    assert_eq!(decode_reason("timeout").unwrap(), DenialReason::Timeout);
  }
}
