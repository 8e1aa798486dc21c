//! [`Gatekeeper`]: a matcher wired to a persistence sink.
//!
//! The gatekeeper is the single writer of the pending set. Every decision the
//! matcher emits is appended to the sink, and denied decisions additionally
//! raise an alert when alerts are enabled.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::{
  decision::AccessDecision,
  matcher::Matcher,
  observation::Observation,
  sink::DecisionSink,
  stats::Stats,
};

pub struct Gatekeeper<S> {
  matcher:        Matcher,
  sink:           S,
  alerts_enabled: bool,
}

impl<S: DecisionSink> Gatekeeper<S> {
  pub fn new(matcher: Matcher, sink: S, alerts_enabled: bool) -> Self {
    Self { matcher, sink, alerts_enabled }
  }

  pub fn matcher(&self) -> &Matcher { &self.matcher }

  pub fn sink(&self) -> &S { &self.sink }

  pub fn stats(&self) -> Stats { self.matcher.stats() }

  /// Feed one observation and persist whatever it concludes.
  ///
  /// When persistence fails the matcher's state is not rolled back; the
  /// first error is returned after every decision has been attempted.
  pub async fn submit(
    &mut self,
    observation: Observation,
  ) -> Result<Vec<AccessDecision>, S::Error> {
    let decisions = self.matcher.observe(observation);
    self.publish(decisions).await
  }

  /// Periodic expiry sweep.
  pub async fn tick(
    &mut self,
    now: DateTime<Utc>,
  ) -> Result<Vec<AccessDecision>, S::Error> {
    let decisions = self.matcher.sweep(now);
    self.publish(decisions).await
  }

  /// Close every pending entry; called once when the gate stops.
  pub async fn shutdown(
    &mut self,
    now: DateTime<Utc>,
  ) -> Result<Vec<AccessDecision>, S::Error> {
    let decisions = self.matcher.flush(now);
    self.publish(decisions).await
  }

  /// Append every decision, even after a failure, and report the first
  /// failure to the caller.
  async fn publish(
    &self,
    decisions: Vec<AccessDecision>,
  ) -> Result<Vec<AccessDecision>, S::Error> {
    let mut first_error = None;

    for decision in &decisions {
      if decision.is_granted() {
        info!(decision_id = %decision.decision_id, "{}", decision.summary());
      } else {
        warn!(decision_id = %decision.decision_id, "{}", decision.summary());
      }

      let mut result = self.sink.append_decision(decision).await;
      if result.is_ok() && self.alerts_enabled && !decision.is_granted() {
        result = self.sink.append_alert(decision).await;
      }
      if let Err(e) = result {
        error!(decision_id = %decision.decision_id, "failed to persist decision: {e}");
        first_error.get_or_insert(e);
      }
    }

    match first_error {
      Some(e) => Err(e),
      None => Ok(decisions),
    }
  }
}
