//! Observations: one-sided sightings produced by the recognition layer.
//!
//! An observation is immutable once built. The constructors are the input
//! boundary: an empty key or a confidence outside `[0, 1]` is rejected there
//! and never reaches the matcher.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

fn check_confidence(confidence: f32) -> Result<f32> {
  if (0.0..=1.0).contains(&confidence) {
    Ok(confidence)
  } else {
    Err(Error::ConfidenceOutOfRange(confidence))
  }
}

fn non_empty(value: &str) -> Option<String> {
  let trimmed = value.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

// ─── Vehicle ─────────────────────────────────────────────────────────────────

/// A recognised licence plate at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleObservation {
  /// Canonical compact plate, e.g. `MH12AB1234`.
  pub plate:       String,
  pub confidence:  f32,
  pub observed_at: DateTime<Utc>,
}

impl VehicleObservation {
  pub fn new(
    plate: &str,
    confidence: f32,
    observed_at: DateTime<Utc>,
  ) -> Result<Self> {
    Ok(Self {
      plate: non_empty(plate).ok_or(Error::EmptyPlate)?,
      confidence: check_confidence(confidence)?,
      observed_at,
    })
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// A recognised ID card: subject identifier plus whatever else was readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityObservation {
  #[serde(rename = "id")]
  pub subject_id:  String,
  pub name:        Option<String>,
  pub department:  Option<String>,
  pub confidence:  f32,
  pub observed_at: DateTime<Utc>,
}

impl IdentityObservation {
  pub fn new(
    subject_id: &str,
    name: Option<&str>,
    confidence: f32,
    observed_at: DateTime<Utc>,
  ) -> Result<Self> {
    Ok(Self {
      subject_id: non_empty(subject_id).ok_or(Error::EmptySubject)?,
      name: name.and_then(non_empty),
      department: None,
      confidence: check_confidence(confidence)?,
      observed_at,
    })
  }

  pub fn with_department(mut self, department: Option<&str>) -> Self {
    self.department = department.and_then(non_empty);
    self
  }
}

// ─── Observation ─────────────────────────────────────────────────────────────

/// Which side of an access attempt an observation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
  Vehicle,
  Identity,
}

impl ObservationKind {
  /// The kind an observation of this kind pairs with.
  pub fn counterpart(self) -> Self {
    match self {
      Self::Vehicle => Self::Identity,
      Self::Identity => Self::Vehicle,
    }
  }
}

/// Key under which a pending observation is held. At most one pending entry
/// exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PendingKey {
  Plate(String),
  Subject(String),
}

impl fmt::Display for PendingKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Plate(plate) => write!(f, "vehicle:{plate}"),
      Self::Subject(id) => write!(f, "identity:{id}"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
  Vehicle(VehicleObservation),
  Identity(IdentityObservation),
}

impl Observation {
  pub fn kind(&self) -> ObservationKind {
    match self {
      Self::Vehicle(_) => ObservationKind::Vehicle,
      Self::Identity(_) => ObservationKind::Identity,
    }
  }

  pub fn key(&self) -> PendingKey {
    match self {
      Self::Vehicle(v) => PendingKey::Plate(v.plate.clone()),
      Self::Identity(i) => PendingKey::Subject(i.subject_id.clone()),
    }
  }

  pub fn observed_at(&self) -> DateTime<Utc> {
    match self {
      Self::Vehicle(v) => v.observed_at,
      Self::Identity(i) => i.observed_at,
    }
  }

  pub fn confidence(&self) -> f32 {
    match self {
      Self::Vehicle(v) => v.confidence,
      Self::Identity(i) => i.confidence,
    }
  }
}

impl From<VehicleObservation> for Observation {
  fn from(v: VehicleObservation) -> Self { Self::Vehicle(v) }
}

impl From<IdentityObservation> for Observation {
  fn from(i: IdentityObservation) -> Self { Self::Identity(i) }
}
