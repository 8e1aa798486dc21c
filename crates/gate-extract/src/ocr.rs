//! The OCR collaborator contract: `(box, text, confidence)` fragments.
//!
//! Two wire shapes are accepted for each fragment:
//!
//! ```text
//! [[[x, y], [x, y], [x, y], [x, y]], "MH 12 AB 1234", 0.93]     // EasyOCR detail=1
//! {"box": [[x, y], ...], "text": "MH 12 AB 1234", "confidence": 0.93}
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One recognised text region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFragment")]
pub struct OcrFragment {
  /// Polygon around the text, in image pixels. May be empty.
  #[serde(rename = "box")]
  pub bbox:       Vec<[f32; 2]>,
  pub text:       String,
  pub confidence: f32,
}

impl OcrFragment {
  pub fn new(text: &str, confidence: f32) -> Result<Self> {
    Self::with_box(Vec::new(), text, confidence)
  }

  pub fn with_box(
    bbox: Vec<[f32; 2]>,
    text: &str,
    confidence: f32,
  ) -> Result<Self> {
    let fragment = Self { bbox, text: text.to_owned(), confidence };
    fragment.validate()?;
    Ok(fragment)
  }

  /// Reject confidences that are not probabilities (including NaN).
  pub fn validate(&self) -> Result<()> {
    if (0.0..=1.0).contains(&self.confidence) {
      Ok(())
    } else {
      Err(Error::ConfidenceOutOfRange(self.confidence))
    }
  }

  /// Leftmost x coordinate of the box; `0.0` when there is no box.
  pub fn left(&self) -> f32 {
    self
      .bbox
      .iter()
      .map(|[x, _]| *x)
      .reduce(f32::min)
      .unwrap_or(0.0)
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFragment {
  Triple(Vec<[f32; 2]>, String, f32),
  Object {
    #[serde(rename = "box", default)]
    bbox:       Vec<[f32; 2]>,
    text:       String,
    confidence: f32,
  },
}

impl TryFrom<RawFragment> for OcrFragment {
  type Error = Error;

  fn try_from(raw: RawFragment) -> Result<Self> {
    let (bbox, text, confidence) = match raw {
      RawFragment::Triple(bbox, text, confidence) => (bbox, text, confidence),
      RawFragment::Object { bbox, text, confidence } => (bbox, text, confidence),
    };
    Self::with_box(bbox, &text, confidence)
  }
}

fn json_type(value: &serde_json::Value) -> &'static str {
  match value {
    serde_json::Value::Null => "null",
    serde_json::Value::Bool(_) => "a boolean",
    serde_json::Value::Number(_) => "a number",
    serde_json::Value::String(_) => "a string",
    serde_json::Value::Array(_) => "an array",
    serde_json::Value::Object(_) => "an object",
  }
}

/// Decode an OCR payload. Anything other than a sequence of well-formed
/// fragments is an input error.
pub fn parse_fragments(payload: &serde_json::Value) -> Result<Vec<OcrFragment>> {
  if !payload.is_array() {
    return Err(Error::NotASequence(json_type(payload)));
  }
  Ok(Vec::<OcrFragment>::deserialize(payload)?)
}

/// All fragment texts joined by single spaces.
pub fn joined_text(fragments: &[OcrFragment]) -> String {
  fragments
    .iter()
    .map(|f| f.text.trim())
    .filter(|t| !t.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Mean confidence over all fragments; `0.0` for an empty result.
pub fn mean_confidence(fragments: &[OcrFragment]) -> f32 {
  if fragments.is_empty() {
    return 0.0;
  }
  fragments.iter().map(|f| f.confidence).sum::<f32>() / fragments.len() as f32
}
