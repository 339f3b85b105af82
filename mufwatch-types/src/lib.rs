//! # mufwatch-types
//!
//! Core types for ionosonde MUF monitoring. This crate defines the shared
//! vocabulary used by the windowed store, the refresh scheduler, the sample
//! sources and the JSON API.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature for JSON output
//! - **Pure freshness policy**: [`WindowPolicy::classify`] takes `now` as an argument,
//!   so it can be tested without a running clock
//! - **Versioned schema**: Snapshots include version info for forward compatibility
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: JSON/MessagePack/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use mufwatch_types::{Freshness, WindowPolicy};
//! use std::time::Duration;
//!
//! let policy = WindowPolicy::new(Duration::from_secs(600), Duration::from_secs(3600));
//!
//! let now_ms = 10_000_000;
//! assert_eq!(policy.classify(now_ms - 60_000, now_ms), Freshness::Fresh);
//! assert_eq!(policy.classify(now_ms - 600_000, now_ms), Freshness::Stale);
//! assert_eq!(policy.classify(now_ms - 3_600_001, now_ms), Freshness::Absent);
//! ```
//!
//! ## Timestamps
//!
//! All timestamps are Unix epoch milliseconds (`u64`) and carry an `_ms` suffix.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod freshness;
mod reading;
mod snapshot;
mod station;
mod version;

pub use freshness::*;
pub use reading::*;
pub use snapshot::*;
pub use station::*;
pub use version::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the snapshot format.
/// Consumers should check this version and handle older formats appropriately.
pub const SCHEMA_VERSION: u32 = 1;

/// Current wall-clock time as Unix epoch milliseconds.
#[cfg(feature = "std")]
pub fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
