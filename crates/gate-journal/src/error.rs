//! Error type for `gate-journal`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("i/o error on {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed journal file {path}: {source}")]
  Json {
    path:   PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

impl Error {
  pub(crate) fn io(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.to_owned();
    move |source| Self::Io { path, source }
  }

  pub(crate) fn json(
    path: &std::path::Path,
  ) -> impl FnOnce(serde_json::Error) -> Self {
    let path = path.to_owned();
    move |source| Self::Json { path, source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
