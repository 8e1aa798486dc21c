//! End-of-session summary.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use gate_core::stats::Stats;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
  pub session_started:       DateTime<Utc>,
  pub session_ended:         DateTime<Utc>,
  pub statistics:            Stats,
  /// Entries still pending when the report was taken; zero after a flush.
  pub pending_verifications: usize,
  /// Decisions across every daily log in the journal directory.
  pub total_access_logs:     u64,
}

impl SessionReport {
  pub fn file_name(&self) -> String {
    format!(
      "session_report_{}.json",
      self.session_ended.format("%Y%m%d_%H%M%S")
    )
  }

  /// Write the report into `dir` and return the file's path.
  pub async fn write_to(&self, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(self.file_name());
    let bytes = serde_json::to_vec_pretty(self).map_err(Error::json(&path))?;
    fs::create_dir_all(dir).await.map_err(Error::io(dir))?;
    fs::write(&path, bytes).await.map_err(Error::io(&path))?;
    info!(
      path = %path.display(),
      total = self.statistics.total_attempts,
      granted = self.statistics.access_granted,
      denied = self.statistics.access_denied,
      "session report written"
    );
    Ok(path)
  }
}
