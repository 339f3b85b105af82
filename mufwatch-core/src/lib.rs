//! # mufwatch-core
//!
//! Time-windowed MUF store and refresh scheduler.
//!
//! This crate keeps a short rolling history of MUF readings for a fixed set
//! of ionosonde stations, labels each station's latest reading by age, and
//! keeps the history current by fetching every station on an interval.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mufwatch_core::{RefreshScheduler, StaticSource, StoreConfig, WindowedStore};
//! use mufwatch_types::StationId;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(WindowedStore::new(StoreConfig::default()).unwrap());
//!
//!     let source = Arc::new(StaticSource::new());
//!     source.set_value(StationId::roquetes(), 30.1);
//!     source.set_value(StationId::arenosillo(), 29.8);
//!
//!     let scheduler = RefreshScheduler::builder(store.clone(), source)
//!         .interval(Duration::from_secs(300))
//!         .build()
//!         .unwrap();
//!
//!     let handle = scheduler.start();
//!
//!     let snapshot = store.latest();
//!     println!("average MUF: {:?}", snapshot.average);
//!
//!     handle.shutdown().await;
//! }
//! ```
//!
//! ## Features
//!
//! - **Freshness labels**: every read classifies stations as fresh, stale or absent
//! - **Bounded memory**: samples older than the retention window are evicted on write
//! - **Consistent reads**: one read uses one `now` for every station
//! - **Independent fetches**: a slow or failing station never holds up another
//! - **Injectable clock**: tests drive time with [`ManualClock`]

mod clock;
mod error;
mod scheduler;
mod source;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, FetchError, StoreError};
pub use scheduler::{
    RefreshReport, RefreshScheduler, RefreshSchedulerBuilder, SchedulerHandle,
    DEFAULT_FETCH_TIMEOUT, DEFAULT_INTERVAL,
};
pub use source::{SampleSource, StaticSource};
pub use store::{StoreConfig, WindowedStore};

// Re-export types for convenience
pub use mufwatch_types::{
    Attempt, FailureKind, Freshness, Reading, Sample, SeriesPoint, Snapshot, StationId,
    StationReading, WindowPolicy,
};
