//! Event sources for `gatekeeper run`.
//!
//! Input lines arrive over a channel. Stdin is read on a detached OS thread,
//! so a read blocked on a quiet terminal never holds up shutdown: the feeder
//! task stays cancellable and the thread dies with the process.

use std::{io, path::Path};

use anyhow::Context as _;
use chrono::Utc;
use gate_core::observation::Observation;
use tokio::{
  io::{AsyncBufReadExt as _, BufReader},
  sync::mpsc,
};
use tracing::warn;

use crate::ingest::{IngestEvent, Ingestor};

const LINE_BUFFER: usize = 64;

pub type Lines = mpsc::Receiver<io::Result<String>>;

/// Start reading `input`, or stdin when `None`. A read error is delivered
/// once and ends the stream.
pub async fn spawn_lines(input: Option<&Path>) -> anyhow::Result<Lines> {
  let (tx, rx) = mpsc::channel(LINE_BUFFER);

  match input {
    Some(path) => {
      let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {path:?}"))?;
      tokio::spawn(async move {
        let mut lines = BufReader::new(file).lines();
        while let Some(line) = lines.next_line().await.transpose() {
          let failed = line.is_err();
          if tx.send(line).await.is_err() || failed {
            break;
          }
        }
      });
    }
    None => {
      std::thread::Builder::new()
        .name("stdin-reader".to_owned())
        .spawn(move || {
          use std::io::BufRead as _;
          for line in io::stdin().lock().lines() {
            let failed = line.is_err();
            if tx.blocking_send(line).is_err() || failed {
              break;
            }
          }
        })
        .context("failed to start the stdin reader")?;
    }
  }

  Ok(rx)
}

/// Forward every readable event to the actor. Bad lines are logged and
/// skipped; returns the number of lines read.
pub async fn feed(
  mut lines: Lines,
  ingestor: Ingestor,
  tx: mpsc::Sender<Observation>,
) -> anyhow::Result<u64> {
  let mut line_no = 0u64;

  while let Some(line) = lines.recv().await {
    let line = line.context("failed to read input")?;
    line_no += 1;
    let line = line.trim();
    if line.is_empty() {
      continue;
    }

    let event = match IngestEvent::parse(line) {
      Ok(event) => event,
      Err(e) => {
        warn!(line = line_no, error = %e, "skipping unparseable event");
        continue;
      }
    };

    match ingestor.resolve(event, Utc::now()).await {
      Ok(Some(observation)) => {
        if tx.send(observation).await.is_err() {
          break;
        }
      }
      Ok(None) => {}
      Err(e) => warn!(line = line_no, error = %format!("{e:#}"), "skipping event"),
    }
  }
  Ok(line_no)
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use gate_extract::ExtractConfig;
  use tempfile::TempDir;

  use super::*;
  use crate::ingest::Timing;

  fn ingestor() -> Ingestor {
    Ingestor::new(ExtractConfig::default(), None, Timing::Live)
  }

  #[tokio::test]
  async fn file_events_reach_the_actor_and_bad_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.jsonl");
    std::fs::write(
      &path,
      concat!(
        r#"{"kind":"vehicle","plate":"MH12AB1234","confidence":0.9}"#,
        "\n\nnot json\n",
        r#"{"kind":"identity","id":"20230001","confidence":0.8}"#,
        "\n",
      ),
    )
    .unwrap();

    let lines = spawn_lines(Some(path.as_path())).await.unwrap();
    let (tx, mut rx) = mpsc::channel::<Observation>(8);
    let read = feed(lines, ingestor(), tx).await.unwrap();

    assert_eq!(read, 4);
    assert!(matches!(rx.recv().await, Some(Observation::Vehicle(_))));
    assert!(matches!(rx.recv().await, Some(Observation::Identity(_))));
    assert!(rx.recv().await.is_none());
  }

  #[tokio::test]
  async fn missing_input_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let absent = dir.path().join("absent.jsonl");
    assert!(spawn_lines(Some(absent.as_path())).await.is_err());
  }

  #[tokio::test]
  async fn read_errors_end_the_feed() {
    let (line_tx, lines) = mpsc::channel(4);
    line_tx.send(Err(io::Error::other("device gone"))).await.unwrap();
    let (tx, _rx) = mpsc::channel::<Observation>(8);
    assert!(feed(lines, ingestor(), tx).await.is_err());
  }

  #[tokio::test]
  async fn a_quiet_source_does_not_block_cancellation() {
    // The sender stays alive, like a terminal nobody is typing into.
    let (_line_tx, lines) = mpsc::channel::<io::Result<String>>(4);
    let (tx, _rx) = mpsc::channel::<Observation>(8);
    let feeder = tokio::spawn(feed(lines, ingestor(), tx));

    feeder.abort();
    let joined = tokio::time::timeout(Duration::from_secs(1), feeder)
      .await
      .expect("feeder did not stop");
    assert!(joined.unwrap_err().is_cancelled());
  }
}
