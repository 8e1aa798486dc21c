//! [`JournalSink`]: daily JSON access logs and plain-text alert files.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use chrono::{DateTime, NaiveDate, Utc};
use gate_core::{decision::AccessDecision, sink::DecisionSink};
use serde::{Deserialize, Serialize};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::debug;

use crate::{Error, Result};

const ALERT_SEPARATOR_WIDTH: usize = 70;

/// Contents of one `access_log_<date>.json` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
  pub date:    NaiveDate,
  pub records: Vec<AccessDecision>,
}

/// A [`DecisionSink`] writing into a directory of daily files.
///
/// Decisions are filed under the UTC date of their timestamp. Each append
/// rewrites the day's log through a temporary file and a rename, so a crash
/// never leaves a half-written log behind. Clones share one lock.
#[derive(Clone)]
pub struct JournalSink {
  dir:  PathBuf,
  /// Serialises the read-modify-write of the daily log.
  lock: Arc<Mutex<()>>,
}

impl JournalSink {
  /// Use `dir` for journal files, creating it if needed.
  pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
    let dir = dir.into();
    fs::create_dir_all(&dir).await.map_err(Error::io(&dir))?;
    Ok(Self { dir, lock: Arc::new(Mutex::new(())) })
  }

  pub fn dir(&self) -> &Path { &self.dir }

  pub fn log_path(&self, date: NaiveDate) -> PathBuf {
    self.dir.join(format!("access_log_{}.json", date.format("%Y-%m-%d")))
  }

  pub fn alert_path(&self, date: NaiveDate) -> PathBuf {
    self.dir.join(format!("alerts_{}.txt", date.format("%Y-%m-%d")))
  }

  /// The log for `date`; an empty log when no file exists yet.
  pub async fn read_log(&self, date: NaiveDate) -> Result<DailyLog> {
    let path = self.log_path(date);
    match fs::read(&path).await {
      Ok(bytes) => serde_json::from_slice(&bytes).map_err(Error::json(&path)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        Ok(DailyLog { date, records: Vec::new() })
      }
      Err(e) => Err(Error::io(&path)(e)),
    }
  }

  /// Number of decisions across every daily log in the directory.
  pub async fn total_records(&self) -> Result<u64> {
    let mut total = 0u64;
    let mut entries = fs::read_dir(&self.dir).await.map_err(Error::io(&self.dir))?;
    while let Some(entry) = entries.next_entry().await.map_err(Error::io(&self.dir))? {
      let name = entry.file_name();
      let Some(date) = name
        .to_str()
        .and_then(|n| n.strip_prefix("access_log_"))
        .and_then(|n| n.strip_suffix(".json"))
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
      else {
        continue;
      };
      total += self.read_log(date).await?.records.len() as u64;
    }
    Ok(total)
  }

  async fn write_atomically(&self, path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await.map_err(Error::io(&tmp))?;
    fs::rename(&tmp, path).await.map_err(Error::io(path))
  }
}

/// The human-readable block appended to the alert file for one decision.
pub fn format_alert(decision: &AccessDecision) -> String {
  let mut block = format!("\nALERT: Access Denied at {}", decision.timestamp.to_rfc3339());
  if let Some(identity) = &decision.identity {
    block.push_str(&format!(
      "\n   ID: {} - {}",
      identity.subject_id,
      identity.name.as_deref().unwrap_or("unknown")
    ));
  }
  if let Some(vehicle) = &decision.vehicle {
    block.push_str(&format!("\n   Vehicle: {}", vehicle.plate));
  }
  let reason = decision
    .reason
    .map(|r| r.as_str())
    .unwrap_or("verification failed");
  block.push_str(&format!("\n   Reason: {reason}\n"));
  block.push_str(&"-".repeat(ALERT_SEPARATOR_WIDTH));
  block.push('\n');
  block
}

fn day(at: DateTime<Utc>) -> NaiveDate { at.date_naive() }

impl DecisionSink for JournalSink {
  type Error = Error;

  async fn append_decision(&self, decision: &AccessDecision) -> Result<()> {
    let date = day(decision.timestamp);
    let path = self.log_path(date);

    let _guard = self.lock.lock().await;
    let mut log = self.read_log(date).await?;
    log.records.push(decision.clone());
    let bytes = serde_json::to_vec_pretty(&log).map_err(Error::json(&path))?;
    self.write_atomically(&path, &bytes).await?;

    debug!(path = %path.display(), records = log.records.len(), "journal appended");
    Ok(())
  }

  async fn append_alert(&self, decision: &AccessDecision) -> Result<()> {
    let path = self.alert_path(day(decision.timestamp));

    let _guard = self.lock.lock().await;
    let mut file = fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(&path)
      .await
      .map_err(Error::io(&path))?;
    file
      .write_all(format_alert(decision).as_bytes())
      .await
      .map_err(Error::io(&path))?;
    file.flush().await.map_err(Error::io(&path))
  }
}
