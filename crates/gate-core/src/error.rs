//! Error types for `gate-core`.
//!
//! Only boundary validation can fail; the matcher itself is infallible on
//! well-formed observations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("plate must not be empty")]
  EmptyPlate,

  #[error("subject identifier must not be empty")]
  EmptySubject,

  #[error("confidence {0} is outside [0, 1]")]
  ConfidenceOutOfRange(f32),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
