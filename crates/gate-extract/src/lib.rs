//! Turning OCR output into gate observations.
//!
//! Everything here except [`recognizer`] is pure: fragments in, optional
//! fields out. Unreadable fields are `None`; only malformed payloads are
//! errors.

pub mod card;
pub mod error;
pub mod ocr;
pub mod plate;
pub mod reader;
pub mod recognizer;

use serde::{Deserialize, Serialize};

pub use self::{
  card::{CardFields, extract_card},
  error::{Error, Result},
  ocr::{OcrFragment, parse_fragments},
  plate::{NormalizedPlate, PlateKind, PlateReading, extract_plate, normalize_plate},
  reader::{CardReader, PlateReader},
  recognizer::{RemoteRecognizer, TextRecognizer},
};

/// Substrings that disqualify a fragment from being read as a name.
pub const DEFAULT_NAME_DENYLIST: &[&str] = &[
  "apsit",
  "engineering",
  "comp",
  "engineer",
  "technology",
  "institute",
  "department",
  "mech",
  "civil",
  "elect",
  "principal",
  "charitable",
  "trust",
  "address",
  "addross",
  "shah",
  "parshvanalh",
  "thane",
  "academic",
  "year",
  "photo",
  "signature",
  "id no",
  "a.p.",
];

/// Tunables shared by the card and plate extractors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
  /// Fragments at or below this confidence are ignored for names and plates.
  pub min_ocr_confidence: f32,
  /// Lowercase substrings; matched case-insensitively.
  pub name_denylist:      Vec<String>,
}

impl Default for ExtractConfig {
  fn default() -> Self {
    Self {
      min_ocr_confidence: 0.6,
      name_denylist:      DEFAULT_NAME_DENYLIST
        .iter()
        .map(|kw| (*kw).to_owned())
        .collect(),
    }
  }
}
