//! Error types for the store, the scheduler and sample sources.

use std::time::Duration;

use mufwatch_types::{FailureKind, StationId};
use thiserror::Error;

/// Invalid store or scheduler configuration. Fatal at startup.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The station list is empty.
    #[error("No stations configured")]
    NoStations,

    /// The same station appears twice.
    #[error("Station '{0}' configured more than once")]
    DuplicateStation(StationId),

    /// `stale_threshold` is not strictly below `retention_window`.
    #[error("Stale threshold ({stale:?}) must be shorter than retention window ({retention:?})")]
    ThresholdOrder {
        stale: Duration,
        retention: Duration,
    },

    /// The refresh interval is zero.
    #[error("Refresh interval must be non-zero")]
    ZeroInterval,

    /// The fetch timeout is zero.
    #[error("Fetch timeout must be non-zero")]
    ZeroTimeout,
}

/// A write the store refused. The store is left unchanged apart from the
/// station's attempt record.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    /// The station is not one of the configured stations.
    #[error("Unknown station '{0}'")]
    UnknownStation(StationId),

    /// The value is NaN or infinite.
    #[error("Non-finite value {value} for station '{station}'")]
    NonFiniteValue { station: StationId, value: f64 },
}

/// Errors that can occur when fetching a sample from a remote source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The response did not carry a value for the station.
    #[error("Station '{0}' not reported")]
    NotReported(StationId),
}

impl FetchError {
    /// The failure kind recorded in the store for this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Timeout => FailureKind::Timeout,
            FetchError::Connection(_) => FailureKind::Unreachable,
            FetchError::Http(_) => FailureKind::Http,
            FetchError::Parse(_) => FailureKind::Malformed,
            FetchError::NotReported(_) => FailureKind::NotReported,
        }
    }

    /// Build an error of the given kind for `station`.
    pub fn from_kind(kind: FailureKind, station: &StationId) -> Self {
        match kind {
            FailureKind::Timeout => FetchError::Timeout,
            FailureKind::Unreachable => FetchError::Connection(format!("{station} unreachable")),
            FailureKind::Http => FetchError::Http(format!("{station} request rejected")),
            FailureKind::Malformed => FetchError::Parse(format!("{station} payload malformed")),
            FailureKind::NotReported => FetchError::NotReported(station.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_from_kind() {
        let station = StationId::roquetes();
        for kind in [
            FailureKind::Timeout,
            FailureKind::Unreachable,
            FailureKind::Http,
            FailureKind::Malformed,
            FailureKind::NotReported,
        ] {
            assert_eq!(FetchError::from_kind(kind, &station).kind(), kind);
        }
    }

    #[test]
    fn threshold_order_message_names_both_limits() {
        let err = ConfigError::ThresholdOrder {
            stale: Duration::from_secs(3600),
            retention: Duration::from_secs(600),
        };
        let msg = err.to_string();
        assert!(msg.contains("3600s"));
        assert!(msg.contains("600s"));
    }
}
