//! JSON Lines ingest: one detector or OCR event per line.
//!
//! ```text
//! {"kind":"vehicle","plate":"MH 12 AB 1234","confidence":0.91}
//! {"kind":"identity","id":"20230001","name":"JOHN SMITH","confidence":0.8}
//! {"kind":"card_ocr","fragments":[[[[0,0],[9,0],[9,9],[0,9]],"20230001",0.9]]}
//! {"kind":"plate_image","path":"crops/plate_0042.jpg"}
//! ```
//!
//! Every event may carry `observed_at` (RFC 3339). Live runs stamp events on
//! arrival; replays require and use the recorded time.

use std::path::PathBuf;

use anyhow::{Context as _, anyhow, bail};
use chrono::{DateTime, Utc};
use gate_core::observation::{IdentityObservation, Observation, VehicleObservation};
use gate_extract::{
  CardReader, ExtractConfig, PlateReader, RemoteRecognizer, normalize_plate,
  parse_fragments,
  reader::{identity_from_fragments, vehicle_from_fragments},
};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestEvent {
  Vehicle {
    plate:       String,
    confidence:  f32,
    #[serde(default)]
    observed_at: Option<DateTime<Utc>>,
  },
  Identity {
    id:          String,
    #[serde(default)]
    name:        Option<String>,
    #[serde(default)]
    department:  Option<String>,
    confidence:  f32,
    #[serde(default)]
    observed_at: Option<DateTime<Utc>>,
  },
  PlateOcr {
    fragments:   serde_json::Value,
    #[serde(default)]
    observed_at: Option<DateTime<Utc>>,
  },
  CardOcr {
    fragments:   serde_json::Value,
    #[serde(default)]
    observed_at: Option<DateTime<Utc>>,
  },
  PlateImage {
    path:        PathBuf,
    #[serde(default)]
    observed_at: Option<DateTime<Utc>>,
  },
  CardImage {
    path:        PathBuf,
    #[serde(default)]
    observed_at: Option<DateTime<Utc>>,
  },
}

impl IngestEvent {
  pub fn parse(line: &str) -> serde_json::Result<Self> { serde_json::from_str(line) }

  pub fn observed_at(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::Vehicle { observed_at, .. }
      | Self::Identity { observed_at, .. }
      | Self::PlateOcr { observed_at, .. }
      | Self::CardOcr { observed_at, .. }
      | Self::PlateImage { observed_at, .. }
      | Self::CardImage { observed_at, .. } => *observed_at,
    }
  }
}

/// Whose clock stamps incoming observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
  /// Arrival time; recorded times are ignored.
  Live,
  /// The event's own `observed_at`, which must be present.
  Replay,
}

/// Compact uppercase plate; the canonical form when the text is a valid
/// Indian plate.
pub fn canonical_plate(text: &str) -> String {
  match normalize_plate(text) {
    Some(plate) => plate.plate,
    None => text
      .chars()
      .filter(char::is_ascii_alphanumeric)
      .map(|c| c.to_ascii_uppercase())
      .collect(),
  }
}

/// Turns ingest events into observations.
pub struct Ingestor {
  extract: ExtractConfig,
  readers: Option<(PlateReader<RemoteRecognizer>, CardReader<RemoteRecognizer>)>,
  timing:  Timing,
}

impl Ingestor {
  pub fn new(
    extract: ExtractConfig,
    recognizer: Option<RemoteRecognizer>,
    timing: Timing,
  ) -> Self {
    let readers = recognizer.map(|r| {
      (
        PlateReader::new(r.clone(), extract.clone()),
        CardReader::new(r, extract.clone()),
      )
    });
    Self { extract, readers, timing }
  }

  /// The observation an event describes; `None` when nothing readable was
  /// in it.
  pub async fn resolve(
    &self,
    event: IngestEvent,
    received_at: DateTime<Utc>,
  ) -> anyhow::Result<Option<Observation>> {
    let at = match self.timing {
      Timing::Live => received_at,
      Timing::Replay => event
        .observed_at()
        .ok_or_else(|| anyhow!("replayed events need observed_at"))?,
    };

    let observation: Option<Observation> = match event {
      IngestEvent::Vehicle { plate, confidence, .. } => Some(
        VehicleObservation::new(&canonical_plate(&plate), confidence, at)?.into(),
      ),
      IngestEvent::Identity { id, name, department, confidence, .. } => Some(
        IdentityObservation::new(&id, name.as_deref(), confidence, at)?
          .with_department(department.as_deref())
          .into(),
      ),
      IngestEvent::PlateOcr { fragments, .. } => {
        let fragments = parse_fragments(&fragments)?;
        vehicle_from_fragments(&fragments, &self.extract, at)?.map(Into::into)
      }
      IngestEvent::CardOcr { fragments, .. } => {
        let fragments = parse_fragments(&fragments)?;
        identity_from_fragments(&fragments, &self.extract, at)?.map(Into::into)
      }
      IngestEvent::PlateImage { path, .. } => {
        let (plates, _) = self.readers()?;
        let image = read_image(&path).await?;
        plates.observe(&image, at).await?.map(Into::into)
      }
      IngestEvent::CardImage { path, .. } => {
        let (_, cards) = self.readers()?;
        let image = read_image(&path).await?;
        cards.observe(&image, at).await?.map(Into::into)
      }
    };

    if observation.is_none() {
      debug!("event carried nothing readable");
    }
    Ok(observation)
  }

  fn readers(
    &self,
  ) -> anyhow::Result<&(PlateReader<RemoteRecognizer>, CardReader<RemoteRecognizer>)>
  {
    match &self.readers {
      Some(readers) => Ok(readers),
      None => bail!("image events need `recognizer_url` to be configured"),
    }
  }
}

async fn read_image(path: &std::path::Path) -> anyhow::Result<Vec<u8>> {
  tokio::fs::read(path)
    .await
    .with_context(|| format!("failed to read image {}", path.display()))
}
