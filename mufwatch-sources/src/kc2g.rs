//! KC2G source using the public `stations.json` feed.
//!
//! The feed lists every ionosonde KC2G aggregates, each with its station
//! metadata and the latest `mufd` (MUF for a 3000 km path, MHz). This source
//! picks out one configured station per fetch.
//!
//! ## Station matching
//!
//! A feed entry belongs to a station when its name contains one of the
//! station's name patterns (case-insensitive). Entries that match no name are
//! matched by position instead: both coordinates within the matcher's
//! tolerance of the station's reference point. If several entries match the
//! same station, the last one in the feed wins.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mufwatch_sources::kc2g::{Kc2gSource, StationMatcher};
//! use mufwatch_sources::SampleSource;
//! use mufwatch_types::StationId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Kc2gSource::builder()
//!         .endpoint("https://prop.kc2g.com/api/stations.json")
//!         .station(StationMatcher::roquetes())
//!         .station(StationMatcher::new(StationId::new("dourbes"), 50.1, 4.6).name("dourbes"))
//!         .build()?;
//!
//!     let sample = source.fetch(&StationId::new("dourbes")).await?;
//!     println!("{}: {:.1} MHz", sample.station, sample.value);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mufwatch_core::{Clock, FetchError, SampleSource, SystemClock};
use mufwatch_types::{Sample, StationId};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::from_reqwest;

/// Default KC2G feed URL.
pub const DEFAULT_ENDPOINT: &str = "https://prop.kc2g.com/api/stations.json";

/// Default bound on one HTTP request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default coordinate tolerance in degrees.
pub const DEFAULT_TOLERANCE_DEG: f64 = 0.5;

/// How to recognise one station in the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct StationMatcher {
    station: StationId,
    names: Vec<String>,
    position: Option<(f64, f64)>,
    tolerance_deg: f64,
}

impl StationMatcher {
    /// Match `station` by position around (`latitude`, `longitude`).
    ///
    /// Add name patterns with [`name`](Self::name).
    pub fn new(station: StationId, latitude: f64, longitude: f64) -> Self {
        Self {
            station,
            names: Vec::new(),
            position: Some((latitude, longitude)),
            tolerance_deg: DEFAULT_TOLERANCE_DEG,
        }
    }

    /// Match `station` by name only, using its id as the pattern.
    pub fn by_name(station: StationId) -> Self {
        let pattern = station.as_str().to_string();
        Self {
            station,
            names: Vec::new(),
            position: None,
            tolerance_deg: DEFAULT_TOLERANCE_DEG,
        }
        .name(pattern)
    }

    /// The preset matcher for a known station, or a name-only matcher.
    pub fn for_station(station: &StationId) -> Self {
        match station.as_str() {
            StationId::ROQUETES => Self::roquetes(),
            StationId::ARENOSILLO => Self::arenosillo(),
            _ => Self::by_name(station.clone()),
        }
    }

    /// Roquetes (Ebre Observatory), ~40.8 N 0.5 E.
    pub fn roquetes() -> Self {
        Self::new(StationId::roquetes(), 40.8, 0.5)
            .name("roquetes")
            .name("ebre")
    }

    /// El Arenosillo, ~37.1 N 6.7 W.
    pub fn arenosillo() -> Self {
        Self::new(StationId::arenosillo(), 37.1, -6.7).name("arenosillo")
    }

    /// Add a case-insensitive name pattern.
    pub fn name(mut self, pattern: impl AsRef<str>) -> Self {
        self.names.push(pattern.as_ref().to_lowercase());
        self
    }

    /// Set the coordinate tolerance in degrees.
    pub fn tolerance(mut self, degrees: f64) -> Self {
        self.tolerance_deg = degrees;
        self
    }

    /// The station this matcher identifies.
    pub fn station(&self) -> &StationId {
        &self.station
    }

    fn matches_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.names.iter().any(|pattern| name.contains(pattern.as_str()))
    }

    fn matches_position(&self, latitude: f64, longitude: f64) -> bool {
        match self.position {
            Some((lat, lon)) => {
                (latitude - lat).abs() < self.tolerance_deg
                    && (longitude - lon).abs() < self.tolerance_deg
            }
            None => false,
        }
    }
}

/// Fetches MUF readings from the KC2G station feed.
#[derive(Debug, Clone)]
pub struct Kc2gSource {
    client: Client,
    endpoint: String,
    matchers: Vec<StationMatcher>,
    clock: Arc<dyn Clock>,
    description: String,
}

impl Kc2gSource {
    /// Create a new builder for configuring the source.
    pub fn builder() -> Kc2gSourceBuilder {
        Kc2gSourceBuilder::default()
    }

    /// The feed URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The configured matchers, in priority order.
    pub fn matchers(&self) -> &[StationMatcher] {
        &self.matchers
    }

    async fn fetch_feed(&self) -> Result<String, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(from_reqwest)?;

        if !response.status().is_success() {
            return Err(FetchError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        response.text().await.map_err(from_reqwest)
    }

    /// Find `station`'s MUF in a raw feed body.
    fn select(&self, body: &str, station: &StationId) -> Result<f64, FetchError> {
        let entries: Vec<serde_json::Value> =
            serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

        trace!(entries = entries.len(), "Parsed KC2G feed");

        let mut found = None;
        for raw in entries {
            // Entries that are not station objects are skipped, not fatal
            let Ok(entry) = serde_json::from_value::<FeedEntry>(raw) else {
                continue;
            };
            if self.identify(&entry.station) == Some(station) {
                found = Some(entry);
            }
        }

        let Some(entry) = found else {
            return Err(FetchError::NotReported(station.clone()));
        };

        debug!(
            station = %station,
            code = %entry.station.code,
            name = %entry.station.name,
            "Matched KC2G station"
        );

        match entry.mufd {
            None => Err(FetchError::NotReported(station.clone())),
            Some(raw) => match raw.as_f64() {
                Some(value) if value.is_finite() => Ok(value),
                _ => Err(FetchError::Parse(format!(
                    "Unreadable mufd {:?} for station '{}'",
                    raw, station
                ))),
            },
        }
    }

    /// Which configured station an entry belongs to, if any.
    fn identify(&self, info: &StationInfo) -> Option<&StationId> {
        if let Some(m) = self.matchers.iter().find(|m| m.matches_name(&info.name)) {
            return Some(&m.station);
        }

        let latitude = info.latitude.as_ref().and_then(NumberOrString::as_f64)?;
        let longitude = info.longitude.as_ref().and_then(NumberOrString::as_f64)?;
        self.matchers
            .iter()
            .find(|m| m.matches_position(latitude, longitude))
            .map(|m| &m.station)
    }
}

#[async_trait]
impl SampleSource for Kc2gSource {
    async fn fetch(&self, station: &StationId) -> Result<Sample, FetchError> {
        if !self.matchers.iter().any(|m| m.station == *station) {
            return Err(FetchError::NotReported(station.clone()));
        }

        let body = self.fetch_feed().await?;
        let value = self.select(&body, station)?;

        // The feed's own timestamps lag; stamp with arrival time.
        Ok(Sample::new(station.clone(), value, self.clock.now_ms()))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for Kc2gSource.
#[derive(Debug, Default)]
pub struct Kc2gSourceBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
    matchers: Vec<StationMatcher>,
    clock: Option<Arc<dyn Clock>>,
}

impl Kc2gSourceBuilder {
    /// Set the feed URL (default: the public KC2G feed).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the HTTP request timeout (default: 5 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a station matcher.
    ///
    /// Without any, the source matches Roquetes and El Arenosillo.
    pub fn station(mut self, matcher: StationMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Stamp samples with `clock` instead of the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the source.
    pub fn build(self) -> Result<Kc2gSource, FetchError> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(from_reqwest)?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let matchers = if self.matchers.is_empty() {
            vec![StationMatcher::roquetes(), StationMatcher::arenosillo()]
        } else {
            self.matchers
        };

        Ok(Kc2gSource {
            client,
            description: format!("kc2g ({})", endpoint),
            endpoint,
            matchers,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        })
    }
}

/// One entry of the KC2G `stations.json` array.
#[derive(Debug, Deserialize)]
struct FeedEntry {
    station: StationInfo,
    #[serde(default)]
    mufd: Option<NumberOrString>,
}

#[derive(Debug, Deserialize)]
struct StationInfo {
    #[serde(default)]
    code: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    latitude: Option<NumberOrString>,
    #[serde(default)]
    longitude: Option<NumberOrString>,
}

/// The feed encodes some numbers as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrString::Number(n) => Some(*n),
            NumberOrString::Text(s) => s.trim().parse().ok(),
        }
    }
}
