//! Indian number-plate normalisation.
//!
//! OCR reads plates with the usual confusions (`O`/`0`, `B`/`8`, ...).
//! Because every section of the layout is either all letters or all digits,
//! those confusions can be undone by position before validation.

use serde::{Deserialize, Serialize};

use crate::{ExtractConfig, Result, ocr::OcrFragment};

pub const VALID_STATE_CODES: &[&str] = &[
  "AP", "AR", "AS", "BR", "CG", "GA", "GJ", "HR", "HP", "JK", "JH", "KA", "KL",
  "MP", "MH", "MN", "ML", "MZ", "NL", "OD", "PB", "RJ", "SK", "TN", "TS", "TR",
  "UP", "UK", "WB", "AN", "CH", "DN", "DD", "DL", "LD", "PY",
];

/// `(letter, digit)` pairs OCR commonly swaps.
const LOOKALIKES: &[(char, char)] = &[
  ('O', '0'),
  ('D', '0'),
  ('Q', '0'),
  ('I', '1'),
  ('L', '1'),
  ('S', '5'),
  ('Z', '2'),
  ('B', '8'),
  ('G', '6'),
];

/// The letter reading of a digit is the first listed pair.
const DIGIT_AS_LETTER: &[(char, char)] = &[
  ('0', 'O'),
  ('1', 'I'),
  ('5', 'S'),
  ('2', 'Z'),
  ('8', 'B'),
  ('6', 'G'),
];

fn as_digit(c: char) -> Option<char> {
  if c.is_ascii_digit() {
    return Some(c);
  }
  LOOKALIKES.iter().find(|(l, _)| *l == c).map(|(_, d)| *d)
}

fn as_letter(c: char) -> Option<char> {
  if c.is_ascii_uppercase() {
    return Some(c);
  }
  DIGIT_AS_LETTER.iter().find(|(d, _)| *d == c).map(|(_, l)| *l)
}

fn digits(chars: &[char]) -> Option<String> {
  chars.iter().map(|c| as_digit(*c)).collect()
}

fn letters(chars: &[char]) -> Option<String> {
  chars.iter().map(|c| as_letter(*c)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateKind {
  /// `LL DD L{1,3} DDDD`, e.g. `MH 12 AB 1234`.
  Standard,
  /// `DD BH DDDD L{1,2}`, e.g. `22 BH 1234 AB`.
  Bharat,
}

/// A validated plate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPlate {
  /// Compact form, used as the matcher key.
  pub plate:   String,
  /// Sections joined by `-`.
  pub display: String,
  pub kind:    PlateKind,
}

impl NormalizedPlate {
  fn from_sections(sections: [String; 4], kind: PlateKind) -> Self {
    Self { plate: sections.concat(), display: sections.join("-"), kind }
  }
}

fn standard(chars: &[char]) -> Option<NormalizedPlate> {
  // 2 state + 1..2 district + 1..3 series + 4 number
  if !(8..=11).contains(&chars.len()) {
    return None;
  }
  let (state, rest) = chars.split_at(2);
  let (middle, number) = rest.split_at(rest.len() - 4);

  let state = letters(state)?;
  if !VALID_STATE_CODES.contains(&state.as_str()) {
    return None;
  }

  // Trust real digits for the district length; fall back to lookalikes.
  let max_district = 2usize.min(middle.len() - 1);
  let real = middle.iter().take_while(|c| c.is_ascii_digit()).count();
  let district_len = if real > 0 {
    real.min(max_district)
  } else {
    middle
      .iter()
      .take(max_district)
      .take_while(|c| as_digit(**c).is_some())
      .count()
  };
  if district_len == 0 {
    return None;
  }
  let (district, series) = middle.split_at(district_len);
  if series.len() > 3 {
    return None;
  }

  Some(NormalizedPlate::from_sections(
    [state, digits(district)?, letters(series)?, digits(number)?],
    PlateKind::Standard,
  ))
}

fn bharat(chars: &[char]) -> Option<NormalizedPlate> {
  if !(9..=10).contains(&chars.len()) {
    return None;
  }
  let year = digits(&chars[..2])?;
  if letters(&chars[2..4])? != "BH" {
    return None;
  }
  let number = digits(&chars[4..8])?;
  let series = letters(&chars[8..])?;
  Some(NormalizedPlate::from_sections(
    [year, "BH".to_owned(), number, series],
    PlateKind::Bharat,
  ))
}

/// Normalise raw plate text; `None` when it is not a valid Indian plate.
pub fn normalize_plate(text: &str) -> Option<NormalizedPlate> {
  let mut chars: Vec<char> = text
    .chars()
    .filter(char::is_ascii_alphanumeric)
    .map(|c| c.to_ascii_uppercase())
    .collect();
  // The "IND" hologram strip is often read into the text.
  if chars.len() > 10 && chars.starts_with(&['I', 'N', 'D']) {
    chars.drain(..3);
  }
  bharat(&chars).or_else(|| standard(&chars))
}

/// A plate read from OCR fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateReading {
  #[serde(flatten)]
  pub plate:      NormalizedPlate,
  pub raw_text:   String,
  /// Mean OCR confidence of the fragments the plate was read from.
  pub confidence: f32,
}

/// Read a plate from the fragments of one crop.
///
/// Fragments above the OCR floor are joined left to right; if that does not
/// validate, single fragments are tried from most to least confident.
pub fn extract_plate(
  fragments: &[OcrFragment],
  config: &ExtractConfig,
) -> Result<Option<PlateReading>> {
  for fragment in fragments {
    fragment.validate()?;
  }

  let mut usable: Vec<&OcrFragment> = fragments
    .iter()
    .filter(|f| f.confidence > config.min_ocr_confidence)
    .collect();
  if usable.is_empty() {
    return Ok(None);
  }

  usable.sort_by(|a, b| a.left().total_cmp(&b.left()));
  let joined: String = usable.iter().map(|f| f.text.as_str()).collect();
  if let Some(plate) = normalize_plate(&joined) {
    let confidence =
      usable.iter().map(|f| f.confidence).sum::<f32>() / usable.len() as f32;
    return Ok(Some(PlateReading { plate, raw_text: joined, confidence }));
  }

  usable.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
  Ok(usable.into_iter().find_map(|f| {
    normalize_plate(&f.text).map(|plate| PlateReading {
      plate,
      raw_text: f.text.clone(),
      confidence: f.confidence,
    })
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn plate(text: &str) -> Option<String> { normalize_plate(text).map(|p| p.plate) }

  fn boxed(text: &str, x: f32, confidence: f32) -> OcrFragment {
    OcrFragment::with_box(vec![[x, 0.0], [x + 50.0, 20.0]], text, confidence)
      .unwrap()
  }

  #[test]
  fn clean_plates() {
    let p = normalize_plate("mh 12 ab 1234").unwrap();
    assert_eq!(p.plate, "MH12AB1234");
    assert_eq!(p.display, "MH-12-AB-1234");
    assert_eq!(p.kind, PlateKind::Standard);
    assert_eq!(plate("DL-3C-AB-1234").as_deref(), Some("DL3CAB1234"));
    assert_eq!(plate("KA 05 M 9999").as_deref(), Some("KA05M9999"));
  }

  #[test]
  fn lookalikes_are_corrected_by_position() {
    assert_eq!(plate("MH I2 A8 l234").as_deref(), Some("MH12AB1234"));
    assert_eq!(plate("MH12AB12S4").as_deref(), Some("MH12AB1254"));
    assert_eq!(plate("0D 02 AB 1234").as_deref(), Some("OD02AB1234"));
  }

  #[test]
  fn unknown_state_is_rejected() {
    assert_eq!(plate("XX12AB1234"), None);
  }

  #[test]
  fn wrong_shape_is_rejected() {
    assert_eq!(plate("MH12"), None);
    assert_eq!(plate("MH12ABCD1234"), None);
    assert_eq!(plate("MHAB1234"), None);
    assert_eq!(plate(""), None);
  }

  #[test]
  fn bharat_series() {
    let p = normalize_plate("22 BH 1234 AB").unwrap();
    assert_eq!(p.plate, "22BH1234AB");
    assert_eq!(p.display, "22-BH-1234-AB");
    assert_eq!(p.kind, PlateKind::Bharat);
  }

  #[test]
  fn hologram_prefix_is_dropped() {
    assert_eq!(plate("IND MH 12 AB 1234").as_deref(), Some("MH12AB1234"));
  }

  #[test]
  fn fragments_are_joined_left_to_right() {
    let fragments = vec![
      boxed("AB 1234", 120.0, 0.9),
      boxed("MH 12", 10.0, 0.8),
      boxed("noise", 200.0, 0.3),
    ];
    let reading = extract_plate(&fragments, &ExtractConfig::default())
      .unwrap()
      .unwrap();
    assert_eq!(reading.plate.plate, "MH12AB1234");
    assert!((reading.confidence - 0.85).abs() < 1e-6);
  }

  #[test]
  fn falls_back_to_single_fragments() {
    let fragments = vec![
      boxed("GOVT OF INDIA", 0.0, 0.7),
      boxed("MH12AB1234", 60.0, 0.9),
    ];
    let reading = extract_plate(&fragments, &ExtractConfig::default())
      .unwrap()
      .unwrap();
    assert_eq!(reading.plate.plate, "MH12AB1234");
    assert_eq!(reading.confidence, 0.9);
  }

  #[test]
  fn nothing_readable() {
    let fragments = vec![boxed("MH12AB1234", 0.0, 0.5)];
    assert_eq!(
      extract_plate(&fragments, &ExtractConfig::default()).unwrap(),
      None
    );
  }
}
