//! # mufwatch
//!
//! Library side of the `mufwatch` binary: settings loading, the JSON API and
//! logging setup. The store and scheduler live in `mufwatch-core`; the KC2G
//! client lives in `mufwatch-sources`.

pub mod api;
pub mod config;
pub mod duration;
pub mod logging;

pub use api::{serve, ApiState};
pub use config::{RuntimeConfig, Settings};
