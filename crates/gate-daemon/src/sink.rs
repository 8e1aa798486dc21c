//! The daemon's sink: every decision goes to SQLite and to the journal.

use gate_core::{decision::AccessDecision, sink::DecisionSink};
use gate_journal::JournalSink;
use gate_store_sqlite::SqliteDecisionLog;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
  #[error("decision store: {0}")]
  Store(#[from] gate_store_sqlite::Error),

  #[error("journal: {0}")]
  Journal(#[from] gate_journal::Error),
}

/// Writes to both backends. A failure in one does not skip the other; the
/// store's error is reported first.
pub struct GateSink {
  pub store:   SqliteDecisionLog,
  pub journal: JournalSink,
}

impl GateSink {
  pub fn new(store: SqliteDecisionLog, journal: JournalSink) -> Self {
    Self { store, journal }
  }
}

fn first_failure(
  store: gate_store_sqlite::Result<()>,
  journal: gate_journal::Result<()>,
) -> Result<(), SinkError> {
  store?;
  journal?;
  Ok(())
}

impl DecisionSink for GateSink {
  type Error = SinkError;

  async fn append_decision(&self, decision: &AccessDecision) -> Result<(), SinkError> {
    let store = self.store.append_decision(decision).await;
    let journal = self.journal.append_decision(decision).await;
    first_failure(store, journal)
  }

  async fn append_alert(&self, decision: &AccessDecision) -> Result<(), SinkError> {
    let store = self.store.append_alert(decision).await;
    let journal = self.journal.append_alert(decision).await;
    first_failure(store, journal)
  }
}
