//! Error types for the field extractor and recognition backends.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("OCR result must be a sequence, got {0}")]
  NotASequence(&'static str),

  #[error("malformed OCR fragment: {0}")]
  MalformedFragment(#[from] serde_json::Error),

  #[error("OCR confidence {0} is outside [0, 1]")]
  ConfidenceOutOfRange(f32),

  #[error("recognizer request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("recognizer returned HTTP {0}")]
  Status(u16),

  #[error("invalid recognizer endpoint {0:?}")]
  InvalidEndpoint(String),

  #[error("observation rejected: {0}")]
  Observation(#[from] gate_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
