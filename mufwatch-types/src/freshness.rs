//! Freshness classification.

use core::time::Duration;

/// How current a value is, derived from its age at read time.
///
/// Variants are ordered from best to worst, so `max()` over a set of
/// labels yields the most degraded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Freshness {
    /// Younger than the stale threshold.
    Fresh,
    /// Retained, but at least as old as the stale threshold.
    Stale,
    /// No retained value.
    Absent,
}

impl Freshness {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Freshness::Fresh => "FRESH",
            Freshness::Stale => "STALE",
            Freshness::Absent => "ABSENT",
        }
    }

    /// Whether a value with this label is usable.
    pub fn is_present(&self) -> bool {
        !matches!(self, Freshness::Absent)
    }
}

/// The two age limits that drive freshness and retention.
///
/// `stale_threshold` must be strictly below `retention_window`; the store
/// rejects a policy that violates this at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    /// Age at which a retained value stops being fresh.
    pub stale_threshold: Duration,
    /// Maximum age of a retained value.
    pub retention_window: Duration,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            stale_threshold: Duration::from_secs(10 * 60),
            retention_window: Duration::from_secs(60 * 60),
        }
    }
}

impl WindowPolicy {
    /// Create a policy from its two limits.
    pub const fn new(stale_threshold: Duration, retention_window: Duration) -> Self {
        Self {
            stale_threshold,
            retention_window,
        }
    }

    /// Whether `stale_threshold < retention_window`.
    pub fn is_ordered(&self) -> bool {
        self.stale_threshold < self.retention_window
    }

    /// Age of a value observed at `observed_at_ms`, as seen at `now_ms`.
    ///
    /// Timestamps in the future have age zero.
    pub fn age(observed_at_ms: u64, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(observed_at_ms))
    }

    /// Whether a value observed at `observed_at_ms` is still retained at `now_ms`.
    ///
    /// The boundary is inclusive: a value exactly `retention_window` old is kept.
    pub fn is_retained(&self, observed_at_ms: u64, now_ms: u64) -> bool {
        Self::age(observed_at_ms, now_ms) <= self.retention_window
    }

    /// Classify a value observed at `observed_at_ms` as seen at `now_ms`.
    ///
    /// A value exactly `stale_threshold` old is already stale.
    pub fn classify(&self, observed_at_ms: u64, now_ms: u64) -> Freshness {
        let age = Self::age(observed_at_ms, now_ms);
        if age < self.stale_threshold {
            Freshness::Fresh
        } else if age <= self.retention_window {
            Freshness::Stale
        } else {
            Freshness::Absent
        }
    }

    /// Classify an optional observation; `None` is always absent.
    pub fn classify_opt(&self, observed_at_ms: Option<u64>, now_ms: u64) -> Freshness {
        observed_at_ms
            .map(|t| self.classify(t, now_ms))
            .unwrap_or(Freshness::Absent)
    }

    /// Earliest timestamp still retained at `now_ms`.
    pub fn retention_cutoff_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.retention_window.as_millis() as u64)
    }
}
