//! SQL schema for the gate's SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for later migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Decisions are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS access_decisions (
    decision_id   TEXT PRIMARY KEY,
    timestamp     TEXT NOT NULL,   -- RFC 3339 UTC, fixed nanosecond width
    decision      TEXT NOT NULL,   -- 'granted' | 'denied'
    status        TEXT NOT NULL,   -- MatchStatus, snake_case
    reason        TEXT,            -- NULL when granted
    plate         TEXT,            -- copied out of vehicle_json for lookups
    subject_id    TEXT,            -- copied out of identity_json for lookups
    vehicle_json  TEXT,            -- JSON VehicleObservation or NULL
    identity_json TEXT             -- JSON IdentityObservation or NULL
);

-- One row per alert raised for a denied decision.
CREATE TABLE IF NOT EXISTS alerts (
    alert_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    decision_id TEXT NOT NULL REFERENCES access_decisions(decision_id),
    raised_at   TEXT NOT NULL,
    reason      TEXT,
    message     TEXT NOT NULL
);

-- Plate ownership, consulted when pairing is restricted to registered pairs.
CREATE TABLE IF NOT EXISTS vehicles (
    plate            TEXT PRIMARY KEY,
    owner_subject_id TEXT NOT NULL,
    registered_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS decisions_timestamp_idx ON access_decisions(timestamp);
CREATE INDEX IF NOT EXISTS decisions_plate_idx     ON access_decisions(plate);
CREATE INDEX IF NOT EXISTS decisions_subject_idx   ON access_decisions(subject_id);
CREATE INDEX IF NOT EXISTS alerts_decision_idx     ON alerts(decision_id);

PRAGMA user_version = 1;
";
