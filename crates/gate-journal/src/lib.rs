//! Flat-file decision journal.
//!
//! One pretty-printed JSON log and one plain-text alert file per UTC day,
//! plus a JSON session report written when the gate stops:
//!
//! ```text
//! <dir>/access_log_2024-01-31.json
//! <dir>/alerts_2024-01-31.txt
//! <dir>/session_report_20240131_174502.json
//! ```

mod journal;
mod report;

pub mod error;

pub use error::{Error, Result};
pub use journal::{DailyLog, JournalSink};
pub use report::SessionReport;
