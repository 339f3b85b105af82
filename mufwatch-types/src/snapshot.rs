//! Snapshot - a point-in-time view of every station plus the average.

use alloc::collections::BTreeMap;

use crate::{FailureKind, Freshness, SchemaVersion, StationId};

/// The last fetch attempt recorded for a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attempt {
    /// Unix timestamp in milliseconds of the attempt.
    pub at_ms: u64,
    /// Why the attempt failed, or `None` if it produced a value.
    pub failure: Option<FailureKind>,
}

impl Attempt {
    /// A successful attempt.
    pub fn succeeded(at_ms: u64) -> Self {
        Self {
            at_ms,
            failure: None,
        }
    }

    /// A failed attempt.
    pub fn failed(at_ms: u64, kind: FailureKind) -> Self {
        Self {
            at_ms,
            failure: Some(kind),
        }
    }

    /// Whether the attempt produced a value.
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// Latest view of one station.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StationReading {
    /// Newest retained MUF in MHz, if any.
    pub value: Option<f64>,
    /// When `value` was observed.
    pub observed_at_ms: Option<u64>,
    /// Freshness of `value` at snapshot time.
    pub freshness: Freshness,
    /// Diagnostics: the most recent fetch attempt, successful or not.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub last_attempt: Option<Attempt>,
}

impl StationReading {
    /// A station with no retained value.
    pub fn absent() -> Self {
        Self {
            value: None,
            observed_at_ms: None,
            freshness: Freshness::Absent,
            last_attempt: None,
        }
    }

    /// A station with a retained value.
    pub fn present(value: f64, observed_at_ms: u64, freshness: Freshness) -> Self {
        Self {
            value: Some(value),
            observed_at_ms: Some(observed_at_ms),
            freshness,
            last_attempt: None,
        }
    }

    /// Attach the last attempt record.
    pub fn with_attempt(mut self, attempt: Option<Attempt>) -> Self {
        self.last_attempt = attempt;
        self
    }
}

/// A point-in-time view of all stations and their average.
///
/// Snapshots are derived on every read; they are never stored.
///
/// # Example
///
/// ```rust
/// use mufwatch_types::{Freshness, Snapshot, StationId, StationReading};
///
/// let snapshot = Snapshot::builder()
///     .timestamp_ms(1_000)
///     .station(StationId::roquetes(), StationReading::present(28.4, 900, Freshness::Fresh))
///     .station(StationId::arenosillo(), StationReading::absent())
///     .build();
///
/// // Absent stations are excluded from the average, not counted as zero.
/// assert_eq!(snapshot.average, Some(28.4));
/// assert_eq!(snapshot.average_freshness, Freshness::Fresh);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Schema version for forward compatibility.
    pub version: SchemaVersion,

    /// Unix timestamp in milliseconds of the instant this view was computed for.
    pub timestamp_ms: u64,

    /// Latest reading per station, keyed by station id.
    pub stations: BTreeMap<StationId, StationReading>,

    /// Mean of every non-absent station value, `None` if all are absent.
    pub average: Option<f64>,

    /// Worst freshness among the stations contributing to `average`.
    pub average_freshness: Freshness,
}

impl Snapshot {
    /// Build a snapshot from per-station readings, deriving the average.
    pub fn from_readings(timestamp_ms: u64, stations: BTreeMap<StationId, StationReading>) -> Self {
        let contributing = stations.values().filter(|r| r.freshness.is_present());

        let average = average_of(contributing.clone().map(|r| r.value));
        let average_freshness = if average.is_some() {
            contributing
                .map(|r| r.freshness)
                .max()
                .unwrap_or(Freshness::Absent)
        } else {
            Freshness::Absent
        };

        Self {
            version: SchemaVersion::current(),
            timestamp_ms,
            stations,
            average,
            average_freshness,
        }
    }

    /// A snapshot in which every listed station is absent.
    pub fn all_absent<'a>(
        timestamp_ms: u64,
        stations: impl IntoIterator<Item = &'a StationId>,
    ) -> Self {
        let stations = stations
            .into_iter()
            .map(|id| (id.clone(), StationReading::absent()))
            .collect();
        Self::from_readings(timestamp_ms, stations)
    }

    /// Create a builder for constructing snapshots.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Reading for a specific station.
    pub fn get(&self, station: &StationId) -> Option<&StationReading> {
        self.stations.get(station)
    }

    /// Number of stations in the snapshot.
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Check if the snapshot lists no stations.
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Whether every station is absent.
    pub fn is_all_absent(&self) -> bool {
        self.stations
            .values()
            .all(|r| r.freshness == Freshness::Absent)
    }

    /// Round every value (and the average) to `decimals` places.
    #[cfg(feature = "std")]
    pub fn rounded(mut self, decimals: i32) -> Self {
        for reading in self.stations.values_mut() {
            reading.value = reading.value.map(|v| round_to(v, decimals));
        }
        self.average = self.average.map(|v| round_to(v, decimals));
        self
    }
}

/// Builder for constructing `Snapshot` instances.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    timestamp_ms: Option<u64>,
    stations: BTreeMap<StationId, StationReading>,
}

impl SnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the snapshot timestamp.
    pub fn timestamp_ms(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    /// Add a station reading.
    pub fn station(mut self, id: StationId, reading: StationReading) -> Self {
        self.stations.insert(id, reading);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> Snapshot {
        Snapshot::from_readings(self.timestamp_ms.unwrap_or_default(), self.stations)
    }
}

/// One charting point: every station's value at a timestamp plus their average.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeriesPoint {
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Value per station at exactly this timestamp, `None` where the station has no sample.
    pub values: BTreeMap<StationId, Option<f64>>,
    /// Mean of the stations that have a sample at this timestamp.
    pub average: Option<f64>,
}

impl SeriesPoint {
    /// Build a point, deriving the average from `values`.
    pub fn new(timestamp_ms: u64, values: BTreeMap<StationId, Option<f64>>) -> Self {
        let average = average_of(values.values().copied());
        Self {
            timestamp_ms,
            values,
            average,
        }
    }

    /// Value of one station at this point.
    pub fn value(&self, station: &StationId) -> Option<f64> {
        self.values.get(station).copied().flatten()
    }

    /// Round every value (and the average) to `decimals` places.
    ///
    /// The average is rounded from the unrounded values.
    #[cfg(feature = "std")]
    pub fn rounded(mut self, decimals: i32) -> Self {
        for value in self.values.values_mut() {
            *value = value.map(|v| round_to(v, decimals));
        }
        self.average = self.average.map(|v| round_to(v, decimals));
        self
    }
}

/// Mean of the present values; `None` when no value is present.
pub fn average_of(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0_f64, 0_u32), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(feature = "std")]
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn average_excludes_missing_values() {
        assert_eq!(average_of([Some(28.4), None]), Some(28.4));
        assert!(approx(average_of([Some(30.1), Some(29.8)]), 29.95));
        assert_eq!(average_of([None, None]), None);
        assert_eq!(average_of(core::iter::empty()), None);
    }

    #[test]
    fn all_absent_snapshot_has_absent_average() {
        let ids = [StationId::roquetes(), StationId::arenosillo()];
        let snapshot = Snapshot::all_absent(42, ids.iter());

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.is_all_absent());
        assert_eq!(snapshot.average, None);
        assert_eq!(snapshot.average_freshness, Freshness::Absent);
        assert_eq!(snapshot.timestamp_ms, 42);
    }

    #[test]
    fn average_freshness_is_worst_contributor() {
        let snapshot = Snapshot::builder()
            .station(
                StationId::roquetes(),
                StationReading::present(30.0, 1, Freshness::Fresh),
            )
            .station(
                StationId::arenosillo(),
                StationReading::present(29.0, 1, Freshness::Stale),
            )
            .build();

        assert_eq!(snapshot.average, Some(29.5));
        assert_eq!(snapshot.average_freshness, Freshness::Stale);
    }

    #[test]
    fn absent_station_with_leftover_value_is_not_averaged() {
        // Only the freshness label decides whether a reading contributes.
        let stale_leftover = StationReading::present(10.0, 1, Freshness::Absent);

        let snapshot = Snapshot::builder()
            .station(StationId::roquetes(), stale_leftover)
            .station(
                StationId::arenosillo(),
                StationReading::present(20.0, 1, Freshness::Fresh),
            )
            .build();

        assert_eq!(snapshot.average, Some(20.0));
    }

    #[cfg(feature = "std")]
    #[test]
    fn rounded_rounds_values_and_average() {
        let snapshot = Snapshot::builder()
            .station(
                StationId::roquetes(),
                StationReading::present(30.14, 1, Freshness::Fresh),
            )
            .station(
                StationId::arenosillo(),
                StationReading::present(29.86, 1, Freshness::Fresh),
            )
            .build()
            .rounded(1);

        assert_eq!(snapshot.get(&StationId::roquetes()).unwrap().value, Some(30.1));
        assert_eq!(snapshot.get(&StationId::arenosillo()).unwrap().value, Some(29.9));
        assert_eq!(snapshot.average, Some(30.0));
    }

    #[test]
    fn series_point_average_and_lookup() {
        let mut values = BTreeMap::new();
        values.insert(StationId::roquetes(), Some(28.4));
        values.insert(StationId::arenosillo(), None);

        let point = SeriesPoint::new(7, values);
        assert_eq!(point.average, Some(28.4));
        assert_eq!(point.value(&StationId::roquetes()), Some(28.4));
        assert_eq!(point.value(&StationId::arenosillo()), None);
        assert_eq!(point.value(&StationId::new("unknown")), None);
    }

    #[test]
    fn attempt_helpers() {
        assert!(Attempt::succeeded(1).is_ok());
        let failed = Attempt::failed(2, FailureKind::Timeout);
        assert!(!failed.is_ok());
        assert_eq!(failed.failure, Some(FailureKind::Timeout));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn snapshot_json_shape() {
        let snapshot = Snapshot::builder()
            .timestamp_ms(5)
            .station(
                StationId::roquetes(),
                StationReading::present(28.4, 4, Freshness::Fresh),
            )
            .build();

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["stations"]["roquetes"]["freshness"], "FRESH");
        assert_eq!(json["average"], 28.4);
        assert_eq!(json["average_freshness"], "FRESH");
        assert!(json["stations"]["roquetes"].get("last_attempt").is_none());
    }
}
