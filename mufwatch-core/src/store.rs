//! Time-windowed per-station sample store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use mufwatch_types::{
    Attempt, FailureKind, Reading, SeriesPoint, Snapshot, StationId, StationReading, WindowPolicy,
};
use parking_lot::RwLock;
use tracing::{debug, error, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{ConfigError, StoreError};

/// Plain-value configuration of a [`WindowedStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Stations the store accepts writes for.
    pub stations: Vec<StationId>,
    /// Stale threshold and retention window.
    pub policy: WindowPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            stations: vec![StationId::roquetes(), StationId::arenosillo()],
            policy: WindowPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Check the station set and threshold ordering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stations.is_empty() {
            return Err(ConfigError::NoStations);
        }

        let mut seen = BTreeSet::new();
        for station in &self.stations {
            if !seen.insert(station) {
                return Err(ConfigError::DuplicateStation(station.clone()));
            }
        }

        if !self.policy.is_ordered() {
            return Err(ConfigError::ThresholdOrder {
                stale: self.policy.stale_threshold,
                retention: self.policy.retention_window,
            });
        }

        Ok(())
    }
}

/// Samples and bookkeeping for one station.
///
/// Samples are keyed by `observed_at_ms`, which keeps them sorted and makes a
/// duplicate timestamp replace the earlier value.
#[derive(Debug, Default)]
struct SeriesState {
    samples: BTreeMap<u64, f64>,
    last_attempt: Option<Attempt>,
}

impl SeriesState {
    fn record_attempt(&mut self, attempt: Attempt) {
        match self.last_attempt {
            Some(previous) if previous.at_ms > attempt.at_ms => {}
            _ => self.last_attempt = Some(attempt),
        }
    }

    fn evict_before(&mut self, cutoff_ms: u64) -> usize {
        let before = self.samples.len();
        self.samples = self.samples.split_off(&cutoff_ms);
        before - self.samples.len()
    }
}

/// Bounded, thread-safe time series for a fixed set of stations.
///
/// Each station has its own lock, so writes to different stations never
/// contend. The station map itself is fixed at construction and needs no
/// lock. Reads compute `now` once and judge every station against it.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use mufwatch_core::{ManualClock, StoreConfig, WindowedStore};
/// use mufwatch_types::{Freshness, Reading, StationId};
///
/// let clock = Arc::new(ManualClock::new(10_000_000));
/// let store = WindowedStore::with_clock(StoreConfig::default(), clock.clone()).unwrap();
///
/// store.ingest(&StationId::roquetes(), Reading::Value(30.1), 10_000_000).unwrap();
/// store.ingest(&StationId::arenosillo(), Reading::Value(29.8), 10_000_000).unwrap();
///
/// let snapshot = store.latest();
/// assert!((snapshot.average.unwrap() - 29.95).abs() < 1e-9);
///
/// clock.advance(Duration::from_secs(11 * 60));
/// assert_eq!(store.latest().average_freshness, Freshness::Stale);
/// ```
#[derive(Debug)]
pub struct WindowedStore {
    series: BTreeMap<StationId, RwLock<SeriesState>>,
    policy: WindowPolicy,
    clock: Arc<dyn Clock>,
}

impl WindowedStore {
    /// Create a store reading the system clock.
    pub fn new(config: StoreConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store with an injected clock.
    pub fn with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;

        let series = config
            .stations
            .into_iter()
            .map(|id| (id, RwLock::new(SeriesState::default())))
            .collect();

        Ok(Self {
            series,
            policy: config.policy,
            clock,
        })
    }

    /// The configured stations, in iteration order.
    pub fn stations(&self) -> impl Iterator<Item = &StationId> {
        self.series.keys()
    }

    /// Whether `station` is one of the configured stations.
    pub fn has_station(&self, station: &StationId) -> bool {
        self.series.contains_key(station)
    }

    /// The freshness and retention policy.
    pub fn policy(&self) -> WindowPolicy {
        self.policy
    }

    /// Current time according to the store's clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Record the outcome of one fetch.
    ///
    /// A value is inserted at its sorted position, replacing any sample with
    /// the same timestamp. An error marker only updates the station's last
    /// attempt. Either way, samples older than the retention window (relative
    /// to the clock at ingestion) are evicted before the lock is released.
    pub fn ingest(
        &self,
        station: &StationId,
        reading: Reading,
        observed_at_ms: u64,
    ) -> Result<(), StoreError> {
        let Some(series) = self.series.get(station) else {
            error!(station = %station, "Dropping write for unknown station");
            return Err(StoreError::UnknownStation(station.clone()));
        };

        let cutoff_ms = self.policy.retention_cutoff_ms(self.clock.now_ms());
        let mut state = series.write();

        let result = match reading {
            Reading::Value(value) if value.is_finite() => {
                let replaced = state.samples.insert(observed_at_ms, value);
                state.record_attempt(Attempt::succeeded(observed_at_ms));
                debug!(
                    station = %station,
                    value,
                    observed_at_ms,
                    replaced = replaced.is_some(),
                    "Ingested sample"
                );
                Ok(())
            }
            Reading::Value(value) => {
                state.record_attempt(Attempt::failed(observed_at_ms, FailureKind::Malformed));
                warn!(station = %station, value, "Rejected non-finite sample");
                Err(StoreError::NonFiniteValue {
                    station: station.clone(),
                    value,
                })
            }
            Reading::Failed(kind) => {
                state.record_attempt(Attempt::failed(observed_at_ms, kind));
                debug!(station = %station, failure = %kind, "Recorded failed attempt");
                Ok(())
            }
        };

        let evicted = state.evict_before(cutoff_ms);
        if evicted > 0 {
            debug!(station = %station, evicted, "Evicted expired samples");
        }

        result
    }

    /// Latest view of every station at the clock's current time.
    pub fn latest(&self) -> Snapshot {
        self.latest_at(self.clock.now_ms())
    }

    /// Latest view of every station as seen at `now_ms`.
    ///
    /// A sample that has aged past the retention window is reported absent
    /// even if no write has evicted it yet. Samples stamped after `now_ms`
    /// are not visible.
    pub fn latest_at(&self, now_ms: u64) -> Snapshot {
        let cutoff_ms = self.policy.retention_cutoff_ms(now_ms);

        let stations = self
            .series
            .iter()
            .map(|(id, series)| {
                let state = series.read();
                let reading = match state.samples.range(cutoff_ms..=now_ms).next_back() {
                    Some((&observed_at_ms, &value)) => StationReading::present(
                        value,
                        observed_at_ms,
                        self.policy.classify(observed_at_ms, now_ms),
                    ),
                    None => StationReading::absent(),
                };
                (id.clone(), reading.with_attempt(state.last_attempt))
            })
            .collect();

        Snapshot::from_readings(now_ms, stations)
    }

    /// Chart series covering the last `window` at the clock's current time.
    pub fn series(&self, window: Duration) -> Vec<SeriesPoint> {
        self.series_at(window, self.clock.now_ms())
    }

    /// Chart series covering `window` before `now_ms`.
    ///
    /// `window` is clamped to the retention window, and the span covered is
    /// `[now_ms - window, now_ms]`. The result holds one point per distinct
    /// timestamp across all stations, in ascending order.
    /// A station without a sample at a timestamp is `None` there and does not
    /// count towards that point's average.
    pub fn series_at(&self, window: Duration, now_ms: u64) -> Vec<SeriesPoint> {
        let window = window.min(self.policy.retention_window);
        let from_ms = now_ms.saturating_sub(window.as_millis() as u64);

        let per_station: Vec<(&StationId, Vec<(u64, f64)>)> = self
            .series
            .iter()
            .map(|(id, series)| {
                let state = series.read();
                let samples = state
                    .samples
                    .range(from_ms..=now_ms)
                    .map(|(&t, &v)| (t, v))
                    .collect();
                (id, samples)
            })
            .collect();

        let mut points: BTreeMap<u64, BTreeMap<StationId, Option<f64>>> = BTreeMap::new();
        for (id, samples) in &per_station {
            for &(t, value) in samples {
                points
                    .entry(t)
                    .or_insert_with(|| self.series.keys().map(|s| (s.clone(), None)).collect())
                    .insert((*id).clone(), Some(value));
            }
        }

        points
            .into_iter()
            .map(|(t, values)| SeriesPoint::new(t, values))
            .collect()
    }

    /// Number of samples still retained at the clock's current time.
    pub fn sample_count(&self) -> usize {
        let cutoff_ms = self.policy.retention_cutoff_ms(self.clock.now_ms());
        self.series
            .values()
            .map(|series| series.read().samples.range(cutoff_ms..).count())
            .sum()
    }

    /// Drop every sample and attempt record.
    pub fn clear(&self) {
        for series in self.series.values() {
            *series.write() = SeriesState::default();
        }
    }
}
