//! Periodic and on-demand refresh of every station.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use mufwatch_types::{FailureKind, Reading, StationId};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::{ConfigError, FetchError};
use crate::source::SampleSource;
use crate::store::WindowedStore;

/// Default time between scheduled refreshes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default bound on a single station fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Drives ingestion into a [`WindowedStore`].
///
/// A scheduler fetches every configured station from a [`SampleSource`],
/// either on a fixed interval (see [`start`](Self::start)) or on demand (see
/// [`refresh_now`](Self::refresh_now)). Each station is fetched
/// independently: one failure or timeout never holds up another.
///
/// Cloning is cheap and every clone drives the same store.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use mufwatch_core::{RefreshScheduler, StaticSource, StoreConfig, WindowedStore};
///
/// #[tokio::main]
/// async fn main() {
///     let store = Arc::new(WindowedStore::new(StoreConfig::default()).unwrap());
///     let source = Arc::new(StaticSource::new());
///
///     let scheduler = RefreshScheduler::builder(store.clone(), source)
///         .build()
///         .unwrap();
///
///     // Refresh every five minutes in the background
///     let handle = scheduler.start();
///
///     // ... serve reads from `store` ...
///
///     handle.shutdown().await;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    store: Arc<WindowedStore>,
    source: Arc<dyn SampleSource>,
    interval: Duration,
    fetch_timeout: Duration,
}

impl RefreshScheduler {
    /// Create a builder for a scheduler feeding `store` from `source`.
    pub fn builder(
        store: Arc<WindowedStore>,
        source: Arc<dyn SampleSource>,
    ) -> RefreshSchedulerBuilder {
        RefreshSchedulerBuilder::new(store, source)
    }

    /// The store this scheduler writes to.
    pub fn store(&self) -> &Arc<WindowedStore> {
        &self.store
    }

    /// Time between scheduled refreshes.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Bound on a single station fetch.
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Fetch every station once and ingest the results.
    ///
    /// Stations are fetched concurrently. A failed or timed-out fetch is
    /// ingested as an error marker; it is not retried here.
    pub async fn refresh_now(&self) -> RefreshReport {
        let started_at_ms = self.store.now_ms();
        let mut tasks = JoinSet::new();

        for station in self.store.stations() {
            let station = station.clone();
            let store = self.store.clone();
            let source = self.source.clone();
            let timeout = self.fetch_timeout;

            tasks.spawn(async move {
                let outcome = refresh_station(&store, source.as_ref(), &station, timeout).await;
                (station, outcome)
            });
        }

        let mut outcomes = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((station, outcome)) => {
                    outcomes.insert(station, outcome);
                }
                Err(e) => error!("Station refresh task failed: {}", e),
            }
        }

        // A task that panicked left no outcome and no marker
        for station in self.store.stations() {
            if !outcomes.contains_key(station) {
                let kind = FailureKind::Malformed;
                record_failure(&self.store, station, kind);
                outcomes.insert(station.clone(), Err(kind));
            }
        }

        let report = RefreshReport {
            started_at_ms,
            outcomes,
        };

        info!(
            source = self.source.description(),
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            "Refresh complete"
        );

        report
    }

    /// Start periodic refreshes.
    ///
    /// This spawns a tokio task that refreshes immediately and then once per
    /// interval. Returns a handle that stops the task.
    pub fn start(&self) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let scheduler = self.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(interval = ?scheduler.interval, "Refresh scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        scheduler.refresh_now().await;
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Refresh scheduler stopped");
        });

        SchedulerHandle { stop_tx, task }
    }
}

async fn refresh_station(
    store: &WindowedStore,
    source: &dyn SampleSource,
    station: &StationId,
    timeout: Duration,
) -> Result<f64, FailureKind> {
    let fetched = match tokio::time::timeout(timeout, source.fetch(station)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout),
    };

    match fetched {
        Ok(sample) if sample.station == *station => {
            store
                .ingest(station, Reading::Value(sample.value), sample.observed_at_ms)
                .map_err(|_| FailureKind::Malformed)?;
            debug!(station = %station, value = sample.value, "Station refreshed");
            Ok(sample.value)
        }
        Ok(sample) => {
            warn!(
                station = %station,
                returned = %sample.station,
                "Source returned a sample for the wrong station"
            );
            let kind = FailureKind::Malformed;
            record_failure(store, station, kind);
            Err(kind)
        }
        Err(err) => {
            warn!(station = %station, error = %err, "Station fetch failed");
            let kind = err.kind();
            record_failure(store, station, kind);
            Err(kind)
        }
    }
}

fn record_failure(store: &WindowedStore, station: &StationId, kind: FailureKind) {
    if let Err(e) = store.ingest(station, Reading::Failed(kind), store.now_ms()) {
        error!(station = %station, failure = %kind, "Failed to record attempt: {}", e);
    }
}

/// Per-station outcome of one refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    /// Unix timestamp in milliseconds when the refresh began.
    pub started_at_ms: u64,
    /// The fetched value, or why there is none, per station.
    pub outcomes: BTreeMap<StationId, Result<f64, FailureKind>>,
}

impl RefreshReport {
    /// Stations that produced a value.
    pub fn succeeded(&self) -> impl Iterator<Item = (&StationId, f64)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| outcome.ok().map(|v| (id, v)))
    }

    /// Stations that failed, with the reason.
    pub fn failed(&self) -> impl Iterator<Item = (&StationId, FailureKind)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| outcome.err().map(|k| (id, k)))
    }

    /// Whether every station produced a value.
    pub fn is_complete(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Builder for configuring a [`RefreshScheduler`].
#[derive(Debug)]
pub struct RefreshSchedulerBuilder {
    store: Arc<WindowedStore>,
    source: Arc<dyn SampleSource>,
    interval: Option<Duration>,
    fetch_timeout: Option<Duration>,
}

impl RefreshSchedulerBuilder {
    /// Create a new builder.
    pub fn new(store: Arc<WindowedStore>, source: Arc<dyn SampleSource>) -> Self {
        Self {
            store,
            source,
            interval: None,
            fetch_timeout: None,
        }
    }

    /// Set the refresh interval.
    ///
    /// Defaults to 5 minutes if not specified.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set the per-station fetch timeout.
    ///
    /// Defaults to 5 seconds if not specified.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Build the scheduler.
    pub fn build(self) -> Result<RefreshScheduler, ConfigError> {
        let interval = self.interval.unwrap_or(DEFAULT_INTERVAL);
        let fetch_timeout = self.fetch_timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT);

        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if fetch_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(RefreshScheduler {
            store: self.store,
            source: self.source,
            interval,
            fetch_timeout,
        })
    }
}

/// Handle for controlling the periodic refresh task.
///
/// Drop this handle to stop refreshing, or call `stop()` / `shutdown()`
/// explicitly.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the task to stop after its current refresh.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            error!("Refresh scheduler task failed: {}", e);
        }
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
