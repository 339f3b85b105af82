//! Example: Feeding the store from a synthetic source
//!
//! This example drives a `WindowedStore` with a `StaticSource` whose values
//! drift every second, and prints the latest snapshot as each refresh lands.
//! Arenosillo drops out after a few ticks to show the average falling back to
//! the surviving station.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p mufwatch-core --example synthetic_source
//! ```

use std::sync::Arc;
use std::time::Duration;

use mufwatch_core::{
    FailureKind, RefreshScheduler, StaticSource, StationId, StoreConfig, WindowPolicy,
    WindowedStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Synthetic source example");
    println!("Refreshing every second, stale after 3s, dropped after 6s\n");

    let config = StoreConfig {
        policy: WindowPolicy::new(Duration::from_secs(3), Duration::from_secs(6)),
        ..StoreConfig::default()
    };
    let store = Arc::new(WindowedStore::new(config)?);
    let source = Arc::new(StaticSource::new());

    let scheduler = RefreshScheduler::builder(store.clone(), source.clone())
        .interval(Duration::from_secs(1))
        .fetch_timeout(Duration::from_millis(200))
        .build()?;

    let handle = scheduler.start();

    for tick in 0..10u32 {
        source.set_value(StationId::roquetes(), 28.0 + tick as f64 * 0.3);
        if tick < 4 {
            source.set_value(StationId::arenosillo(), 27.5 + tick as f64 * 0.2);
        } else {
            source.set_failure(StationId::arenosillo(), FailureKind::Unreachable);
        }

        tokio::time::sleep(Duration::from_secs(1)).await;

        let snapshot = store.latest().rounded(1);
        println!("Tick {}:", tick);
        for (station, reading) in &snapshot.stations {
            println!(
                "  {:<11} {:>5} {}",
                station,
                reading
                    .value
                    .map(|v| format!("{:.1}", v))
                    .unwrap_or_else(|| "-".to_string()),
                reading.freshness.symbol()
            );
        }
        println!(
            "  {:<11} {:>5} {}",
            "average",
            snapshot
                .average
                .map(|v| format!("{:.1}", v))
                .unwrap_or_else(|| "-".to_string()),
            snapshot.average_freshness.symbol()
        );
    }

    handle.shutdown().await;
    println!("\nSeries points retained: {}", store.series(Duration::from_secs(60)).len());
    Ok(())
}
