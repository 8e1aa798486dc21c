//! [`SqliteDecisionLog`]: the SQLite implementation of [`DecisionSink`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use gate_core::{
  decision::{AccessDecision, DenialReason},
  registry::VehicleRegistry,
  sink::DecisionSink,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    DecisionRow, RawDecision, decode_dt, decode_reason, decode_uuid, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Read models ─────────────────────────────────────────────────────────────

/// One row of the `alerts` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
  pub alert_id:    i64,
  pub decision_id: Uuid,
  pub raised_at:   DateTime<Utc>,
  pub reason:      Option<DenialReason>,
  pub message:     String,
}

/// One row of the `vehicles` table.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredVehicle {
  pub plate:            String,
  pub owner_subject_id: String,
  pub registered_at:    DateTime<Utc>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An append-only decision log backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteDecisionLog {
  conn: tokio_rusqlite::Connection,
}

impl SqliteDecisionLog {
  /// Open (or create) a log at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory log, for tests and dry runs.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Decisions ─────────────────────────────────────────────────────────────

  /// Newest first.
  pub async fn list_decisions(
    &self,
    limit: u32,
    offset: u32,
  ) -> Result<Vec<AccessDecision>> {
    let raws = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM access_decisions
           ORDER BY timestamp DESC, rowid DESC
           LIMIT ?1 OFFSET ?2",
          RawDecision::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], RawDecision::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDecision::into_decision).collect()
  }

  pub async fn get_decision(&self, id: Uuid) -> Result<Option<AccessDecision>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM access_decisions WHERE decision_id = ?1",
          RawDecision::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawDecision::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDecision::into_decision).transpose()
  }

  pub async fn decision_count(&self) -> Result<u64> {
    self.count("SELECT COUNT(*) FROM access_decisions").await
  }

  // ── Alerts ────────────────────────────────────────────────────────────────

  /// Newest first.
  pub async fn list_alerts(&self, limit: u32) -> Result<Vec<Alert>> {
    type RawAlert = (i64, String, String, Option<String>, String);

    let raws: Vec<RawAlert> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT alert_id, decision_id, raised_at, reason, message
           FROM alerts
           ORDER BY alert_id DESC
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(alert_id, decision_id, raised_at, reason, message)| -> Result<Alert> {
        Ok(Alert {
          alert_id,
          decision_id: decode_uuid(&decision_id)?,
          raised_at: decode_dt(&raised_at)?,
          reason: reason.as_deref().map(decode_reason).transpose()?,
          message,
        })
      })
      .collect()
  }

  pub async fn alert_count(&self) -> Result<u64> {
    self.count("SELECT COUNT(*) FROM alerts").await
  }

  // ── Vehicle registry ──────────────────────────────────────────────────────

  /// Register `plate` to `owner_subject_id`, replacing any earlier owner.
  pub async fn register_vehicle(
    &self,
    plate: &str,
    owner_subject_id: &str,
  ) -> Result<RegisteredVehicle> {
    let vehicle = RegisteredVehicle {
      plate:            plate.to_owned(),
      owner_subject_id: owner_subject_id.to_owned(),
      registered_at:    Utc::now(),
    };

    let plate = vehicle.plate.clone();
    let owner = vehicle.owner_subject_id.clone();
    let at_str = encode_dt(vehicle.registered_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO vehicles (plate, owner_subject_id, registered_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (plate) DO UPDATE SET
             owner_subject_id = excluded.owner_subject_id,
             registered_at    = excluded.registered_at",
          rusqlite::params![plate, owner, at_str],
        )?;
        Ok(())
      })
      .await?;

    debug!(
      plate = %vehicle.plate,
      owner = %vehicle.owner_subject_id,
      "vehicle registered"
    );
    Ok(vehicle)
  }

  /// Ordered by plate.
  pub async fn registered_vehicles(&self) -> Result<Vec<RegisteredVehicle>> {
    let raws: Vec<(String, String, String)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT plate, owner_subject_id, registered_at
           FROM vehicles
           ORDER BY plate",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(plate, owner_subject_id, registered_at)| -> Result<_> {
        Ok(RegisteredVehicle {
          plate,
          owner_subject_id,
          registered_at: decode_dt(&registered_at)?,
        })
      })
      .collect()
  }

  /// The registry as the matcher consumes it.
  pub async fn load_registry(&self) -> Result<VehicleRegistry> {
    Ok(
      self
        .registered_vehicles()
        .await?
        .into_iter()
        .map(|v| (v.plate, v.owner_subject_id))
        .collect(),
    )
  }

  async fn count(&self, sql: &'static str) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(sql, [], |row| row.get(0))?))
      .await?;
    Ok(n.max(0).unsigned_abs())
  }
}

// ─── DecisionSink impl ───────────────────────────────────────────────────────

impl DecisionSink for SqliteDecisionLog {
  type Error = crate::Error;

  async fn append_decision(&self, decision: &AccessDecision) -> Result<()> {
    let row = DecisionRow::encode(decision)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO access_decisions (
             decision_id, timestamp, decision, status, reason,
             plate, subject_id, vehicle_json, identity_json
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            row.decision_id,
            row.timestamp,
            row.decision,
            row.status,
            row.reason,
            row.plate,
            row.subject_id,
            row.vehicle_json,
            row.identity_json,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn append_alert(&self, decision: &AccessDecision) -> Result<()> {
    let decision_id = encode_uuid(decision.decision_id);
    let raised_at = encode_dt(decision.timestamp);
    let reason = decision.reason.map(DenialReason::as_str);
    let message = decision.summary();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO alerts (decision_id, raised_at, reason, message)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![decision_id, raised_at, reason, message],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
