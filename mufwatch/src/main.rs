use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mufwatch::api::{self, ApiState, RESPONSE_DECIMALS};
use mufwatch::config::{RuntimeConfig, Settings};
use mufwatch::{duration, logging};
use mufwatch_core::{RefreshScheduler, WindowedStore};
use mufwatch_sources::kc2g::{Kc2gSource, StationMatcher};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mufwatch")]
#[command(about = "Monitor ionosonde MUF readings and serve them as JSON")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to serve the JSON API on (e.g., "0.0.0.0:8000")
    #[arg(short, long)]
    listen: Option<String>,

    /// Time between refreshes (e.g., "5m", "30s")
    #[arg(short, long)]
    interval: Option<String>,

    /// Age at which a reading turns stale (e.g., "10m")
    #[arg(long)]
    stale_threshold: Option<String>,

    /// Age at which a reading is dropped (e.g., "60m")
    #[arg(long)]
    retention: Option<String>,

    /// Bound on one station fetch (e.g., "5s")
    #[arg(long)]
    fetch_timeout: Option<String>,

    /// KC2G stations.json URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Refresh once, print the latest snapshot as JSON and exit
    #[arg(long)]
    once: bool,
}

impl Args {
    /// Flags that override file and environment settings.
    fn overrides(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("listen", self.listen.clone()),
            ("interval", self.interval.clone()),
            ("stale_threshold", self.stale_threshold.clone()),
            ("retention", self.retention.clone()),
            ("fetch_timeout", self.fetch_timeout.clone()),
            ("endpoint", self.endpoint.clone()),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level)?;

    let settings = Settings::load(args.config.as_deref(), args.overrides())?;
    let runtime = settings.resolve()?;

    let scheduler = build_scheduler(&runtime)?;

    if args.once {
        return run_once(&scheduler).await;
    }

    run_server(&runtime, scheduler).await
}

/// Wire store, source and scheduler from resolved settings.
fn build_scheduler(runtime: &RuntimeConfig) -> Result<RefreshScheduler> {
    let store = Arc::new(WindowedStore::new(runtime.store.clone())?);

    let source = runtime
        .store
        .stations
        .iter()
        .fold(Kc2gSource::builder(), |builder, station| {
            builder.station(StationMatcher::for_station(station))
        })
        .endpoint(runtime.endpoint.clone())
        .timeout(runtime.fetch_timeout)
        .build()
        .context("Failed to build KC2G client")?;

    let scheduler = RefreshScheduler::builder(store, Arc::new(source))
        .interval(runtime.interval)
        .fetch_timeout(runtime.fetch_timeout)
        .build()?;

    info!(
        stations = runtime.store.stations.len(),
        interval = %duration::format_duration(runtime.interval),
        stale_threshold = %duration::format_duration(runtime.store.policy.stale_threshold),
        retention = %duration::format_duration(runtime.store.policy.retention_window),
        endpoint = %runtime.endpoint,
        "Configured"
    );

    Ok(scheduler)
}

/// Refresh every station once and print the result
async fn run_once(scheduler: &RefreshScheduler) -> Result<()> {
    scheduler.refresh_now().await;
    let snapshot = scheduler.store().latest().rounded(RESPONSE_DECIMALS);
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Refresh on the configured interval and serve the API until Ctrl-C
async fn run_server(runtime: &RuntimeConfig, scheduler: RefreshScheduler) -> Result<()> {
    let listener = TcpListener::bind(runtime.listen)
        .await
        .with_context(|| format!("Failed to bind {}", runtime.listen))?;

    let refresh = scheduler.start();

    let (stop_tx, stop_rx) = watch::channel(false);
    let server = tokio::spawn(api::serve(
        listener,
        Arc::new(ApiState::new(scheduler)),
        stop_rx,
    ));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");

    let _ = stop_tx.send(true);
    refresh.shutdown().await;
    server.await.context("API task panicked")??;

    Ok(())
}
