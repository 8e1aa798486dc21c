//! Core types and the verification matcher for the campus gate.
//!
//! This crate is free of database, file and network dependencies. Storage
//! backends implement [`sink::DecisionSink`]; recognition front ends produce
//! [`observation::Observation`] values and hand them to a
//! [`gatekeeper::Gatekeeper`].

pub mod decision;
pub mod error;
pub mod gatekeeper;
pub mod matcher;
pub mod observation;
pub mod policy;
pub mod registry;
pub mod sink;
pub mod stats;

pub use error::{Error, Result};
