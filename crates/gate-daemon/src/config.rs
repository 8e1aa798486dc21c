//! Runtime configuration, layered from `gatekeeper.toml` and `GATE_*`
//! environment variables.
//!
//! Nested keys use `__` in the environment:
//!
//! ```text
//! GATE_STORE_PATH=/var/lib/gatekeeper/gate.db
//! GATE_MATCHER__REQUIRE_BOTH=false
//! GATE_EXTRACT__MIN_OCR_CONFIDENCE=0.5
//! ```

use std::path::{Path, PathBuf};

use gate_core::policy::MatcherConfig;
use gate_extract::ExtractConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
  pub store_path:              PathBuf,
  /// Daily logs, alert files and session reports.
  pub journal_dir:             PathBuf,
  pub matcher:                 MatcherConfig,
  pub extract:                 ExtractConfig,
  pub alerts_enabled:          bool,
  /// Live mode only; replays sweep on observation time.
  pub sweep_interval_ms:       u64,
  /// Needed only for `plate_image` / `card_image` events.
  pub recognizer_url:          Option<String>,
  pub recognizer_timeout_secs: u64,
}

impl Default for GateConfig {
  fn default() -> Self {
    Self {
      store_path:              PathBuf::from("~/.local/share/gatekeeper/gate.db"),
      journal_dir:             PathBuf::from("~/.local/share/gatekeeper/logs"),
      matcher:                 MatcherConfig::default(),
      extract:                 ExtractConfig::default(),
      alerts_enabled:          true,
      sweep_interval_ms:       1_000,
      recognizer_url:          None,
      recognizer_timeout_secs: 30,
    }
  }
}

impl GateConfig {
  /// Read `path` (optional) under the process environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::load_with_env(path, None)
  }

  /// As [`GateConfig::load`], reading variables from `env` instead of the
  /// process environment when given.
  pub fn load_with_env(
    path: &Path,
    env: Option<config::Map<String, String>>,
  ) -> Result<Self, config::ConfigError> {
    let mut cfg: Self = config::Config::builder()
      .add_source(
        config::File::from(path.to_path_buf())
          .format(config::FileFormat::Toml)
          .required(false),
      )
      .add_source(
        config::Environment::with_prefix("GATE")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true)
          .source(env),
      )
      .build()?
      .try_deserialize()?;

    cfg.store_path = expand_tilde(&cfg.store_path);
    cfg.journal_dir = expand_tilde(&cfg.journal_dir);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
