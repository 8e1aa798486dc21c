//! The `DecisionSink` trait: where access decisions are persisted.
//!
//! Implemented by storage backends (`gate-store-sqlite`, `gate-journal`).
//! Both operations are append-only; the matcher never updates or deletes a
//! decision it has emitted.

use std::future::Future;

use crate::decision::AccessDecision;

/// Durable, append-only destination for access decisions.
///
/// All methods return `Send` futures so a sink can be driven from a
/// multi-threaded tokio runtime.
pub trait DecisionSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append one decision to the access log.
  fn append_decision(
    &self,
    decision: &AccessDecision,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;

  /// Raise an alert for a denied decision.
  fn append_alert(
    &self,
    decision: &AccessDecision,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
