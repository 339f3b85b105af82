//! Sample source abstraction.
//!
//! A [`SampleSource`] turns a station id into one timestamped MUF reading.
//! The scheduler owns the timeout around every call; sources only report
//! what went wrong.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use mufwatch_types::{FailureKind, Sample, StationId};
use parking_lot::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::error::FetchError;

/// Trait for fetching one station's current MUF.
///
/// Implementations must not panic on bad input; every failure is returned
/// as a [`FetchError`].
#[async_trait]
pub trait SampleSource: Send + Sync + Debug {
    /// Fetch the current reading for `station`.
    async fn fetch(&self, station: &StationId) -> Result<Sample, FetchError>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}

/// An in-memory source that serves whatever was last set per station.
///
/// Samples are stamped with the source's clock at fetch time. Stations that
/// were never set are reported as [`FetchError::NotReported`].
///
/// # Example
///
/// ```rust
/// use mufwatch_core::{SampleSource, StaticSource};
/// use mufwatch_types::StationId;
///
/// # tokio_test::block_on(async {
/// let source = StaticSource::new();
/// source.set_value(StationId::roquetes(), 28.4);
///
/// let sample = source.fetch(&StationId::roquetes()).await.unwrap();
/// assert_eq!(sample.value, 28.4);
/// assert!(source.fetch(&StationId::arenosillo()).await.is_err());
/// # });
/// ```
#[derive(Debug)]
pub struct StaticSource {
    readings: RwLock<BTreeMap<StationId, Result<f64, FailureKind>>>,
    clock: Arc<dyn Clock>,
    description: String,
}

impl StaticSource {
    /// Create an empty source using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty source stamping samples with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            readings: RwLock::new(BTreeMap::new()),
            clock,
            description: "static".to_string(),
        }
    }

    /// Serve `value` for `station` from now on.
    pub fn set_value(&self, station: StationId, value: f64) {
        self.readings.write().insert(station, Ok(value));
    }

    /// Fail every fetch for `station` with `kind` from now on.
    pub fn set_failure(&self, station: StationId, kind: FailureKind) {
        self.readings.write().insert(station, Err(kind));
    }

    /// Forget `station`; later fetches report it as not reported.
    pub fn remove(&self, station: &StationId) {
        self.readings.write().remove(station);
    }
}

impl Default for StaticSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SampleSource for StaticSource {
    async fn fetch(&self, station: &StationId) -> Result<Sample, FetchError> {
        let reading = self.readings.read().get(station).copied();
        match reading {
            Some(Ok(value)) => Ok(Sample::new(station.clone(), value, self.clock.now_ms())),
            Some(Err(kind)) => Err(FetchError::from_kind(kind, station)),
            None => Err(FetchError::NotReported(station.clone())),
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn static_source_serves_values_and_failures() {
        let clock = Arc::new(ManualClock::new(42));
        let source = StaticSource::with_clock(clock);

        source.set_value(StationId::roquetes(), 30.1);
        source.set_failure(StationId::arenosillo(), FailureKind::Timeout);

        let sample = source.fetch(&StationId::roquetes()).await.unwrap();
        assert_eq!(sample, Sample::new(StationId::roquetes(), 30.1, 42));

        let err = source.fetch(&StationId::arenosillo()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Timeout);
    }

    #[tokio::test]
    async fn removed_station_is_not_reported() {
        let source = StaticSource::new();
        source.set_value(StationId::roquetes(), 30.1);
        source.remove(&StationId::roquetes());

        let err = source.fetch(&StationId::roquetes()).await.unwrap_err();
        assert!(matches!(err, FetchError::NotReported(_)));
    }
}
