//! Readers: a recogniser plus an extractor, producing observations.

use chrono::{DateTime, Utc};
use gate_core::observation::{IdentityObservation, VehicleObservation};
use tracing::debug;

use crate::{
  ExtractConfig, Result,
  card::{CardFields, extract_card},
  ocr::OcrFragment,
  plate::{PlateReading, extract_plate},
  recognizer::TextRecognizer,
};

/// Identity observation for a card, if its subject identifier was readable.
pub fn identity_from_card(
  card: &CardFields,
  observed_at: DateTime<Utc>,
) -> Result<Option<IdentityObservation>> {
  let Some(subject_id) = card.subject_id.as_deref() else {
    return Ok(None);
  };
  let identity = IdentityObservation::new(
    subject_id,
    card.name.as_deref(),
    card.confidence,
    observed_at,
  )?
  .with_department(card.department.as_deref());
  Ok(Some(identity))
}

pub fn vehicle_from_plate(
  reading: &PlateReading,
  observed_at: DateTime<Utc>,
) -> Result<VehicleObservation> {
  Ok(VehicleObservation::new(
    &reading.plate.plate,
    reading.confidence,
    observed_at,
  )?)
}

/// Identity observations from card fragments.
pub fn identity_from_fragments(
  fragments: &[OcrFragment],
  config: &ExtractConfig,
  observed_at: DateTime<Utc>,
) -> Result<Option<IdentityObservation>> {
  let card = extract_card(fragments, config)?;
  if card.subject_id.is_none() {
    debug!(text = %card.raw_text, "no subject id on card");
  }
  identity_from_card(&card, observed_at)
}

/// Vehicle observations from plate fragments.
pub fn vehicle_from_fragments(
  fragments: &[OcrFragment],
  config: &ExtractConfig,
  observed_at: DateTime<Utc>,
) -> Result<Option<VehicleObservation>> {
  match extract_plate(fragments, config)? {
    Some(reading) => Ok(Some(vehicle_from_plate(&reading, observed_at)?)),
    None => {
      debug!(fragments = fragments.len(), "no valid plate in fragments");
      Ok(None)
    }
  }
}

/// Reads ID-card crops through a [`TextRecognizer`].
#[derive(Debug, Clone)]
pub struct CardReader<R> {
  recognizer: R,
  config:     ExtractConfig,
}

impl<R: TextRecognizer> CardReader<R> {
  pub fn new(recognizer: R, config: ExtractConfig) -> Self {
    Self { recognizer, config }
  }

  pub async fn read(&self, image: &[u8]) -> Result<CardFields> {
    let fragments = self.recognizer.recognize(image).await?;
    extract_card(&fragments, &self.config)
  }

  pub async fn observe(
    &self,
    image: &[u8],
    observed_at: DateTime<Utc>,
  ) -> Result<Option<IdentityObservation>> {
    let fragments = self.recognizer.recognize(image).await?;
    identity_from_fragments(&fragments, &self.config, observed_at)
  }
}

/// Reads plate crops through a [`TextRecognizer`].
#[derive(Debug, Clone)]
pub struct PlateReader<R> {
  recognizer: R,
  config:     ExtractConfig,
}

impl<R: TextRecognizer> PlateReader<R> {
  pub fn new(recognizer: R, config: ExtractConfig) -> Self {
    Self { recognizer, config }
  }

  pub async fn read(&self, image: &[u8]) -> Result<Option<PlateReading>> {
    let fragments = self.recognizer.recognize(image).await?;
    extract_plate(&fragments, &self.config)
  }

  pub async fn observe(
    &self,
    image: &[u8],
    observed_at: DateTime<Utc>,
  ) -> Result<Option<VehicleObservation>> {
    let fragments = self.recognizer.recognize(image).await?;
    vehicle_from_fragments(&fragments, &self.config, observed_at)
  }
}
