//! # mufwatch-sources
//!
//! Ready-to-use [`SampleSource`] implementations for feeding a mufwatch store.
//!
//! ## Supported Sources
//!
//! - **KC2G** (`kc2g` feature, on by default) - Reads the public
//!   `stations.json` feed from prop.kc2g.com and picks out each configured
//!   station by name or position
//! - **Static** - In-memory readings for tests and offline demos, re-exported
//!   from `mufwatch-core`
//!
//! ## Quick Start (KC2G)
//!
//! ```rust,no_run
//! use mufwatch_sources::kc2g::Kc2gSource;
//! use mufwatch_sources::SampleSource;
//! use mufwatch_types::StationId;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Kc2gSource::builder()
//!         .timeout(Duration::from_secs(5))
//!         .build()?;
//!
//!     let sample = source.fetch(&StationId::roquetes()).await?;
//!     println!("Roquetes MUF: {:.1} MHz", sample.value);
//!     Ok(())
//! }
//! ```

#[cfg(feature = "kc2g")]
mod error;

#[cfg(feature = "kc2g")]
pub mod kc2g;

#[cfg(feature = "kc2g")]
pub use kc2g::{Kc2gSource, Kc2gSourceBuilder, StationMatcher};

pub use mufwatch_core::{FetchError, SampleSource, StaticSource};

// Re-export types for convenience
pub use mufwatch_types::{Sample, StationId};
