//! ID-card field extraction.
//!
//! Turns the OCR fragments of a student ID card into a [`CardFields`]
//! record. Every field is best-effort: a field that cannot be read is `None`,
//! never an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
  ExtractConfig, Result,
  ocr::{OcrFragment, joined_text, mean_confidence},
};

// ─── Patterns ────────────────────────────────────────────────────────────────

/// Eight digits starting with `2`, not embedded in a longer digit run.
static SUBJECT_ID_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?:^|[^0-9])(2[0-9]{7})(?:[^0-9]|$)").unwrap());

/// Any eight digits, even inside a longer run.
static ANY_EIGHT_DIGITS_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"([0-9]{8})").unwrap());

/// `2023-2024`, `2023/24`, or a lone `2023`.
static ACADEMIC_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?:^|[^0-9])(20[0-9]{2}(?:\s*[-/]\s*(?:20)?[0-9]{2})?)(?:[^0-9]|$)")
    .unwrap()
});

/// A leading `NAME:` label that OCR often reads into the same fragment.
static NAME_LABEL_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)^\s*name\s*[:.\-]?\s+").unwrap());

const INSTITUTE_KEYWORDS: &[&str] = &["INSTITUTE", "COLLEGE", "UNIVERSITY"];

// ─── Departments ─────────────────────────────────────────────────────────────

pub const COMPUTER: &str = "COMPUTER ENGINEERING";
pub const COMPUTER_SCIENCE: &str = "COMPUTER SCIENCE";
pub const INFORMATION_TECHNOLOGY: &str = "INFORMATION TECHNOLOGY";
pub const MECHANICAL: &str = "MECHANICAL ENGINEERING";
pub const CIVIL: &str = "CIVIL ENGINEERING";
pub const ELECTRICAL: &str = "ELECTRICAL ENGINEERING";
pub const ELECTRONICS: &str = "ELECTRONICS ENGINEERING";
pub const TELECOM: &str = "ELECTRONICS AND TELECOMMUNICATION";
pub const AI_DATA_SCIENCE: &str = "ARTIFICIAL INTELLIGENCE AND DATA SCIENCE";

/// Substring keywords, most specific first.
const DEPARTMENT_KEYWORDS: &[(&str, &str)] = &[
  ("TELECOM", TELECOM),
  ("ARTIFICIAL", AI_DATA_SCIENCE),
  ("DATA SCIENCE", AI_DATA_SCIENCE),
  ("COMPUTER SCIENCE", COMPUTER_SCIENCE),
  ("COMPUTER", COMPUTER),
  ("INFORMATION", INFORMATION_TECHNOLOGY),
  ("MECHANICAL", MECHANICAL),
  ("CIVIL", CIVIL),
  ("ELECTRONICS", ELECTRONICS),
  ("ELECTRICAL", ELECTRICAL),
];

/// Whole-word abbreviations.
const DEPARTMENT_ABBREVIATIONS: &[(&str, &str)] = &[
  ("IT", INFORMATION_TECHNOLOGY),
  ("CSE", COMPUTER),
  ("COMP", COMPUTER),
  ("CE", COMPUTER),
  ("CS", COMPUTER_SCIENCE),
  ("ECE", ELECTRONICS),
  ("EXTC", TELECOM),
  ("EEE", ELECTRICAL),
  ("MECH", MECHANICAL),
  ("AIDS", AI_DATA_SCIENCE),
  ("AIML", AI_DATA_SCIENCE),
];

/// Misspelt stems, only trusted next to an "engineering"-like word.
const DEPARTMENT_TYPO_STEMS: &[(&str, &str)] = &[
  ("COMPU", COMPUTER),
  ("COMP", COMPUTER),
  ("MECH", MECHANICAL),
  ("CIVI", CIVIL),
  ("ELECTRON", ELECTRONICS),
  ("ELEC", ELECTRICAL),
  ("INFO", INFORMATION_TECHNOLOGY),
];

/// Map free OCR text to a canonical department name.
///
/// Full keywords win over abbreviations, which win over typo stems.
pub fn normalize_department(text: &str) -> Option<&'static str> {
  let upper = text.to_uppercase();

  if let Some((_, canonical)) =
    DEPARTMENT_KEYWORDS.iter().find(|(kw, _)| upper.contains(kw))
  {
    return Some(canonical);
  }

  let words: Vec<&str> = upper
    .split(|c: char| !c.is_ascii_alphanumeric() && c != '&')
    .filter(|w| !w.is_empty())
    .collect();
  if let Some((_, canonical)) = DEPARTMENT_ABBREVIATIONS
    .iter()
    .find(|(abbr, _)| words.iter().any(|w| w == abbr))
  {
    return Some(canonical);
  }
  if words.iter().any(|w| *w == "AI&DS") {
    return Some(AI_DATA_SCIENCE);
  }

  if upper.contains("ENGIN") || upper.contains("ENGG") {
    return DEPARTMENT_TYPO_STEMS
      .iter()
      .find(|(stem, _)| upper.contains(stem))
      .map(|(_, canonical)| *canonical);
  }

  None
}

// ─── Identifier ──────────────────────────────────────────────────────────────

/// First subject identifier in `text`: a standalone `2xxxxxxx` run, falling
/// back to the first eight digits anywhere, so an identifier merged with
/// neighbouring digits is still read.
pub fn extract_subject_id(text: &str) -> Option<String> {
  [&*SUBJECT_ID_RE, &*ANY_EIGHT_DIGITS_RE]
    .into_iter()
    .find_map(|re| re.captures(text))
    .map(|caps| caps[1].to_owned())
}

// ─── Name ────────────────────────────────────────────────────────────────────

const NAME_MIN_LEN: usize = 6;
const NAME_MAX_LEN: usize = 30;
const SINGLE_WORD_MIN_LEN: usize = 8;

fn clean_name(text: &str) -> String {
  let unlabelled = NAME_LABEL_RE.replace(text, "");
  unlabelled
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_uppercase()
}

/// Whether `text` (already cleaned) plausibly is a person's name.
pub fn is_valid_name(text: &str, denylist: &[String]) -> bool {
  if text.is_empty() || !text.chars().all(|c| c.is_alphabetic() || c == ' ') {
    return false;
  }

  let len = text.chars().count();
  if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
    return false;
  }

  let lower = text.to_lowercase();
  if denylist.iter().any(|kw| lower.contains(&kw.to_lowercase())) {
    return false;
  }

  if !text.contains(' ') && len < SINGLE_WORD_MIN_LEN {
    return false;
  }

  // At least one vowel in five characters; rejects acronyms like "APSIT".
  let vowels = lower.chars().filter(|c| "aeiou".contains(*c)).count();
  vowels * 5 >= len
}

/// The most confident valid name fragment, longest first on ties.
pub fn extract_name(fragments: &[OcrFragment], config: &ExtractConfig) -> Option<String> {
  fragments
    .iter()
    .filter(|f| f.confidence > config.min_ocr_confidence)
    .map(|f| (clean_name(&f.text), f.confidence))
    .filter(|(name, _)| is_valid_name(name, &config.name_denylist))
    .max_by(|(a, ca), (b, cb)| {
      ca.total_cmp(cb).then_with(|| a.chars().count().cmp(&b.chars().count()))
    })
    .map(|(name, _)| name)
}

// ─── Department, institute, year ───────────────────────────────────────────

/// The department named by the most confident fragment that names one.
pub fn extract_department(fragments: &[OcrFragment]) -> Option<&'static str> {
  let mut ranked: Vec<&OcrFragment> = fragments.iter().collect();
  ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
  ranked.into_iter().find_map(|f| normalize_department(&f.text))
}

pub fn extract_institute(fragments: &[OcrFragment]) -> Option<String> {
  fragments.iter().find_map(|f| {
    let upper = f.text.trim().to_uppercase();
    INSTITUTE_KEYWORDS
      .iter()
      .any(|kw| upper.contains(kw))
      .then(|| upper.split_whitespace().collect::<Vec<_>>().join(" "))
  })
}

pub fn extract_academic_year(text: &str) -> Option<String> {
  ACADEMIC_YEAR_RE
    .captures(text)
    .map(|caps| caps[1].split_whitespace().collect())
}

// ─── Card ────────────────────────────────────────────────────────────────────

/// Structured fields read from one ID card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardFields {
  pub subject_id:    Option<String>,
  pub name:          Option<String>,
  pub department:    Option<String>,
  pub institute:     Option<String>,
  pub academic_year: Option<String>,
  /// Mean OCR confidence across all fragments.
  pub confidence:    f32,
  pub raw_text:      String,
}

/// Extract every field from the OCR fragments of a card.
///
/// Fails only on malformed fragments; unreadable fields are `None`.
pub fn extract_card(
  fragments: &[OcrFragment],
  config: &ExtractConfig,
) -> Result<CardFields> {
  for fragment in fragments {
    fragment.validate()?;
  }

  let raw_text = joined_text(fragments);
  let subject_id = extract_subject_id(&raw_text);
  // The identifier fragment would otherwise feed the year heuristic.
  let year_text = match &subject_id {
    Some(id) => raw_text.replace(id.as_str(), " "),
    None => raw_text.clone(),
  };

  Ok(CardFields {
    subject_id,
    name: extract_name(fragments, config),
    department: extract_department(fragments).map(str::to_owned),
    institute: extract_institute(fragments),
    academic_year: extract_academic_year(&year_text),
    confidence: mean_confidence(fragments),
    raw_text,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn frag(text: &str, confidence: f32) -> OcrFragment {
    OcrFragment::new(text, confidence).unwrap()
  }

  fn cfg() -> ExtractConfig { ExtractConfig::default() }

  #[test]
  fn subject_id_prefers_leading_two() {
    assert_eq!(
      extract_subject_id("ROLL 11223344 ID NO: 22102003").as_deref(),
      Some("22102003")
    );
    assert_eq!(extract_subject_id("ID:20230001").as_deref(), Some("20230001"));
  }

  #[test]
  fn subject_id_falls_back_to_any_eight_digits() {
    assert_eq!(
      extract_subject_id("ROLL 11223344").as_deref(),
      Some("11223344")
    );
  }

  #[test]
  fn subject_id_is_read_out_of_merged_digits() {
    assert_eq!(
      extract_subject_id("ROLL NO 1122334455").as_deref(),
      Some("11223344")
    );
    assert_eq!(extract_subject_id("ID2023000112").as_deref(), Some("20230001"));
    assert_eq!(
      extract_subject_id("PHONE 9820123456 ID 20230001").as_deref(),
      Some("20230001"),
      "a standalone 2xxxxxxx run still wins"
    );
    assert_eq!(extract_subject_id("ID 1234567"), None);
    assert_eq!(extract_subject_id("no digits here"), None);
  }

  #[test]
  fn name_rules() {
    let deny = cfg().name_denylist;
    assert!(is_valid_name("JOHN SMITH", &deny));
    assert!(is_valid_name("KRISHNAMURTHY", &deny));
    assert!(!is_valid_name("RAHUL", &deny), "short single word");
    assert!(!is_valid_name("JOHN SM1TH", &deny), "digit");
    assert!(!is_valid_name("COMPUTER ENGINEERING", &deny), "denylist");
    assert!(!is_valid_name("BRYN GLYNN", &deny), "vowel ratio");
    assert!(!is_valid_name("A VERY LONG STRING OF MANY WORDS", &deny));
    assert!(!is_valid_name("HOLDER SIGNATURE", &deny), "card boilerplate");
    assert!(!is_valid_name("THANE WEST", &deny), "card boilerplate");
  }

  #[test]
  fn boilerplate_loses_to_a_less_confident_name() {
    for boilerplate in ["ACADEMIC YEAR", "SIGNATURE", "HOLDER SIGNATURE", "THANE WEST"] {
      let fragments = [frag(boilerplate, 0.99), frag("JOHN SMITH", 0.9)];
      assert_eq!(
        extract_name(&fragments, &cfg()).as_deref(),
        Some("JOHN SMITH"),
        "{boilerplate}"
      );
    }
  }

  #[test]
  fn name_picks_most_confident_then_longest() {
    let fragments = vec![
      frag("PRIYA SHARMA", 0.80),
      frag("Name: JOHN SMITH", 0.95),
      frag("ANITA DESAI", 0.95),
      frag("COMPUTER ENGINEERING", 0.99),
      frag("MARIA GOMEZ LOPEZ", 0.40),
    ];
    assert_eq!(extract_name(&fragments, &cfg()).as_deref(), Some("ANITA DESAI"));
  }

  #[test]
  fn name_respects_confidence_floor() {
    let fragments = vec![frag("JOHN SMITH", 0.6)];
    assert_eq!(extract_name(&fragments, &cfg()), None);
  }

  #[test]
  fn department_normalisation() {
    assert_eq!(normalize_department("Computer Engineering"), Some(COMPUTER));
    assert_eq!(normalize_department("DEPT: IT"), Some(INFORMATION_TECHNOLOGY));
    assert_eq!(normalize_department("COMPUTR ENGINERING"), Some(COMPUTER));
    assert_eq!(normalize_department("MECHANCAL ENGG"), Some(MECHANICAL));
    assert_eq!(normalize_department("ELECTRONCS ENGINEERING"), Some(ELECTRONICS));
    assert_eq!(normalize_department("EXTC"), Some(TELECOM));
    assert_eq!(normalize_department("INSTITUTE OF TECHNOLOGY"), None);
  }

  #[test]
  fn academic_year_forms() {
    assert_eq!(extract_academic_year("VALID 2023-2024").as_deref(), Some("2023-2024"));
    assert_eq!(extract_academic_year("A.Y. 2023 / 24").as_deref(), Some("2023/24"));
    assert_eq!(extract_academic_year("ID 20230001"), None);
  }

  #[test]
  fn full_card() {
    let fragments = vec![
      frag("A. P. SHAH INSTITUTE OF TECHNOLOGY", 0.88),
      frag("JOHN SMITH", 0.92),
      frag("COMPUTER ENGG", 0.90),
      frag("ID NO: 20230001", 0.85),
      frag("2023-2024", 0.7),
    ];
    let card = extract_card(&fragments, &cfg()).unwrap();
    assert_eq!(card.subject_id.as_deref(), Some("20230001"));
    assert_eq!(card.name.as_deref(), Some("JOHN SMITH"));
    assert_eq!(card.department.as_deref(), Some(COMPUTER));
    assert_eq!(
      card.institute.as_deref(),
      Some("A. P. SHAH INSTITUTE OF TECHNOLOGY")
    );
    assert_eq!(card.academic_year.as_deref(), Some("2023-2024"));
    assert!((card.confidence - 0.85).abs() < 1e-6);
  }

  #[test]
  fn empty_card_is_all_none() {
    let card = extract_card(&[], &cfg()).unwrap();
    assert_eq!(card, CardFields::default());
  }

  #[test]
  fn bad_confidence_is_rejected() {
    let bad = OcrFragment {
      bbox:       vec![],
      text:       "JOHN SMITH".into(),
      confidence: 2.0,
    };
    assert!(extract_card(&[bad], &cfg()).is_err());
  }
}
