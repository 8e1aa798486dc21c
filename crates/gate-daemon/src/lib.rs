//! The gatekeeper daemon: configuration, event ingest, the matcher actor and
//! the combined SQLite + journal sink.

pub mod actor;
pub mod config;
pub mod feed;
pub mod ingest;
pub mod sink;

pub use config::GateConfig;
