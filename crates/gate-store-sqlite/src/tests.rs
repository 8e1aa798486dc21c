//! Integration tests for `SqliteDecisionLog` against an in-memory database.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use gate_core::{
  decision::{AccessDecision, Decision, DenialReason, MatchStatus},
  gatekeeper::Gatekeeper,
  matcher::Matcher,
  observation::{IdentityObservation, VehicleObservation},
  policy::{MatcherConfig, Pairing},
  sink::DecisionSink,
};
use uuid::Uuid;

use crate::SqliteDecisionLog;

async fn store() -> SqliteDecisionLog {
  SqliteDecisionLog::open_in_memory()
    .await
    .expect("in-memory store")
}

fn t(secs: i64) -> DateTime<Utc> {
  Utc.timestamp_opt(1_700_000_000, 0).unwrap() + TimeDelta::seconds(secs)
}

fn vehicle(plate: &str, at: DateTime<Utc>) -> VehicleObservation {
  VehicleObservation::new(plate, 0.9, at).unwrap()
}

fn identity(id: &str, at: DateTime<Utc>) -> IdentityObservation {
  IdentityObservation::new(id, Some("JOHN SMITH"), 0.85, at)
    .unwrap()
    .with_department(Some("COMPUTER ENGINEERING"))
}

fn granted(at: DateTime<Utc>) -> AccessDecision {
  AccessDecision {
    decision_id: Uuid::new_v4(),
    timestamp:   at,
    vehicle:     Some(vehicle("MH12AB1234", at)),
    identity:    Some(identity("20230001", at)),
    decision:    Decision::Granted,
    status:      MatchStatus::Matched,
    reason:      None,
  }
}

fn timed_out(at: DateTime<Utc>) -> AccessDecision {
  AccessDecision {
    decision_id: Uuid::new_v4(),
    timestamp:   at,
    vehicle:     Some(vehicle("KA05M9999", at)),
    identity:    None,
    decision:    Decision::Denied,
    status:      MatchStatus::Expired,
    reason:      Some(DenialReason::Timeout),
  }
}

// ─── Decisions ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn decision_round_trips() {
  let s = store().await;
  let d = granted(t(10));
  s.append_decision(&d).await.unwrap();

  let fetched = s.get_decision(d.decision_id).await.unwrap().unwrap();
  assert_eq!(fetched, d);
}

#[tokio::test]
async fn missing_decision_is_none() {
  let s = store().await;
  assert!(s.get_decision(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_is_newest_first_and_paged() {
  let s = store().await;
  let first = granted(t(0));
  let second = timed_out(t(30));
  let third = granted(t(45));
  for d in [&second, &first, &third] {
    s.append_decision(d).await.unwrap();
  }

  let all = s.list_decisions(10, 0).await.unwrap();
  let ids: Vec<Uuid> = all.iter().map(|d| d.decision_id).collect();
  assert_eq!(ids, vec![third.decision_id, second.decision_id, first.decision_id]);

  let page = s.list_decisions(1, 1).await.unwrap();
  assert_eq!(page.len(), 1);
  assert_eq!(page[0].decision_id, second.decision_id);
  assert_eq!(page[0].reason, Some(DenialReason::Timeout));
  assert!(page[0].identity.is_none());

  assert_eq!(s.decision_count().await.unwrap(), 3);
}

#[tokio::test]
async fn duplicate_decision_id_is_rejected() {
  let s = store().await;
  let d = granted(t(0));
  s.append_decision(&d).await.unwrap();
  assert!(s.append_decision(&d).await.is_err());
  assert_eq!(s.decision_count().await.unwrap(), 1);
}

// ─── Alerts ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn alerts_reference_their_decision() {
  let s = store().await;
  let d = timed_out(t(30));
  s.append_decision(&d).await.unwrap();
  s.append_alert(&d).await.unwrap();

  assert_eq!(s.alert_count().await.unwrap(), 1);
  let alerts = s.list_alerts(10).await.unwrap();
  assert_eq!(alerts[0].decision_id, d.decision_id);
  assert_eq!(alerts[0].reason, Some(DenialReason::Timeout));
  assert_eq!(alerts[0].raised_at, t(30));
  assert!(alerts[0].message.contains("KA05M9999"));
}

#[tokio::test]
async fn alert_for_unknown_decision_fails() {
  let s = store().await;
  assert!(s.append_alert(&timed_out(t(0))).await.is_err());
  assert_eq!(s.alert_count().await.unwrap(), 0);
}

#[tokio::test]
async fn list_alerts_respects_limit() {
  let s = store().await;
  for i in 0..3 {
    let d = timed_out(t(i));
    s.append_decision(&d).await.unwrap();
    s.append_alert(&d).await.unwrap();
  }
  let alerts = s.list_alerts(2).await.unwrap();
  assert_eq!(alerts.len(), 2);
  assert!(alerts[0].alert_id > alerts[1].alert_id);
}

// ─── Vehicle registry ────────────────────────────────────────────────────────

#[tokio::test]
async fn register_and_reregister_vehicle() {
  let s = store().await;
  s.register_vehicle("MH12AB1234", "20230001").await.unwrap();
  s.register_vehicle("DL3CAB1234", "20230002").await.unwrap();
  s.register_vehicle("MH12AB1234", "20230003").await.unwrap();

  let vehicles = s.registered_vehicles().await.unwrap();
  assert_eq!(vehicles.len(), 2);
  assert_eq!(vehicles[0].plate, "DL3CAB1234");
  assert_eq!(vehicles[1].owner_subject_id, "20230003");

  let registry = s.load_registry().await.unwrap();
  assert!(registry.is_owner("MH12AB1234", "20230003"));
  assert!(!registry.is_owner("MH12AB1234", "20230001"));
}

// ─── Gatekeeper over SQLite ──────────────────────────────────────────────────

#[tokio::test]
async fn gatekeeper_persists_grants_and_timeouts() {
  let s = store().await;
  let mut gate =
    Gatekeeper::new(Matcher::new(MatcherConfig::default()), s.clone(), true);

  gate.submit(vehicle("MH12AB1234", t(0)).into()).await.unwrap();
  let out = gate.submit(identity("20230001", t(10)).into()).await.unwrap();
  assert_eq!(out.len(), 1);
  assert!(out[0].is_granted());

  gate.submit(vehicle("KA05M9999", t(20)).into()).await.unwrap();
  let expired = gate.tick(t(51)).await.unwrap();
  assert_eq!(expired.len(), 1);
  assert_eq!(expired[0].timestamp, t(50));

  assert_eq!(s.decision_count().await.unwrap(), 2);
  assert_eq!(s.alert_count().await.unwrap(), 1);
}

#[tokio::test]
async fn registered_pairing_uses_stored_owners() {
  let s = store().await;
  s.register_vehicle("MH12AB1234", "20230001").await.unwrap();
  let config = MatcherConfig { pairing: Pairing::Registered, ..MatcherConfig::default() };
  let matcher = Matcher::new(config).with_registry(s.load_registry().await.unwrap());
  let mut gate = Gatekeeper::new(matcher, s.clone(), false);

  gate.submit(vehicle("MH12AB1234", t(0)).into()).await.unwrap();
  let stranger = gate.submit(identity("20239999", t(5)).into()).await.unwrap();
  assert!(stranger.is_empty());
  let owner = gate.submit(identity("20230001", t(6)).into()).await.unwrap();
  assert_eq!(owner.len(), 1);
  assert!(owner[0].is_granted());

  let flushed = gate.shutdown(t(7)).await.unwrap();
  assert_eq!(flushed.len(), 1);
  assert_eq!(flushed[0].status, MatchStatus::Flushed);
  assert_eq!(s.alert_count().await.unwrap(), 0, "alerts disabled");
}
