//! Samples and fetch outcomes.

use core::fmt;

use crate::StationId;

/// Why a fetch for a station produced no usable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FailureKind {
    /// The fetch did not complete within its timeout.
    Timeout,
    /// The remote API could not be reached.
    Unreachable,
    /// The remote API answered with a non-success status.
    Http,
    /// The payload could not be parsed.
    Malformed,
    /// The payload did not contain the station, or carried no MUF for it.
    NotReported,
}

impl FailureKind {
    /// Short lowercase label used in logs and API output.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Unreachable => "unreachable",
            FailureKind::Http => "http",
            FailureKind::Malformed => "malformed",
            FailureKind::NotReported => "not_reported",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one fetch for one station, as handed to the store.
///
/// A `Failed` reading is an error marker: it is recorded as the station's
/// last attempt but never becomes a [`Sample`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Reading {
    /// A MUF value in MHz.
    Value(f64),
    /// The fetch failed.
    Failed(FailureKind),
}

impl Reading {
    /// The value, if this reading carries one.
    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(*v),
            Reading::Failed(_) => None,
        }
    }

    /// The failure kind, if this reading is an error marker.
    pub fn failure(&self) -> Option<FailureKind> {
        match self {
            Reading::Value(_) => None,
            Reading::Failed(kind) => Some(*kind),
        }
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Reading::Value(value)
    }
}

impl From<FailureKind> for Reading {
    fn from(kind: FailureKind) -> Self {
        Reading::Failed(kind)
    }
}

/// One observation of one station.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// The station that was observed.
    pub station: StationId,
    /// MUF in MHz.
    pub value: f64,
    /// Unix timestamp in milliseconds when the value was captured.
    pub observed_at_ms: u64,
}

impl Sample {
    /// Create a new sample.
    pub fn new(station: StationId, value: f64, observed_at_ms: u64) -> Self {
        Self {
            station,
            value,
            observed_at_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_accessors() {
        assert_eq!(Reading::Value(28.4).value(), Some(28.4));
        assert_eq!(Reading::Value(28.4).failure(), None);
        assert_eq!(Reading::Failed(FailureKind::Timeout).value(), None);
        assert_eq!(
            Reading::from(FailureKind::Malformed).failure(),
            Some(FailureKind::Malformed)
        );
    }

    #[test]
    fn failure_labels() {
        assert_eq!(FailureKind::NotReported.as_str(), "not_reported");
        assert_eq!(alloc::format!("{}", FailureKind::Timeout), "timeout");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::NotReported).unwrap();
        assert_eq!(json, "\"not_reported\"");
    }
}
