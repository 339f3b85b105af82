//! Concurrent writers and readers against one store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mufwatch_core::{
    Freshness, ManualClock, Reading, RefreshScheduler, StaticSource, StationId, StoreConfig,
    WindowedStore,
};

const T0: u64 = 1_700_000_000_000;
const SEC: u64 = 1_000;

fn store() -> (Arc<WindowedStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    let store = WindowedStore::with_clock(StoreConfig::default(), clock.clone()).unwrap();
    (Arc::new(store), clock)
}

#[test]
fn series_stays_consistent_under_concurrent_ingest() {
    let (store, clock) = store();
    let retention_ms = store.policy().retention_window.as_millis() as u64;
    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = [StationId::roquetes(), StationId::arenosillo()]
        .into_iter()
        .map(|station| {
            let store = store.clone();
            let clock = clock.clone();
            thread::spawn(move || {
                for i in 0..2_000u64 {
                    let at = T0 + i * 10 * SEC;
                    // Only one writer moves the clock; both stamp at its pace.
                    if station == StationId::roquetes() {
                        clock.set(at);
                    }
                    store
                        .ingest(&station, Reading::Value(25.0 + (i % 10) as f64), at)
                        .unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut reads = 0usize;
                while !done.load(Ordering::Relaxed) || reads == 0 {
                    let now = store.now_ms();
                    let series = store.series_at(Duration::from_secs(3600), now);

                    let mut previous = None;
                    for point in &series {
                        // Ascending and unique
                        if let Some(prev) = previous {
                            assert!(point.timestamp_ms > prev);
                        }
                        previous = Some(point.timestamp_ms);

                        // Inside the window read at `now`
                        assert!(point.timestamp_ms <= now);
                        assert!(now - point.timestamp_ms <= retention_ms);

                        // Every configured station has a slot
                        assert_eq!(point.values.len(), 2);

                        // The average matches the values at that point
                        let present: Vec<f64> = point.values.values().flatten().copied().collect();
                        assert!(!present.is_empty());
                        let mean = present.iter().sum::<f64>() / present.len() as f64;
                        assert!((point.average.unwrap() - mean).abs() < 1e-9);
                    }

                    let snapshot = store.latest_at(now);
                    for reading in snapshot.stations.values() {
                        if let Some(observed) = reading.observed_at_ms {
                            assert!(observed <= now);
                            assert!(now - observed <= retention_ms);
                        }
                    }
                    reads += 1;
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().unwrap();
    }

    // 2000 samples 10 s apart leave 361 inside a one hour window per station
    let final_now = T0 + 1_999 * 10 * SEC;
    clock.set(final_now);
    let series = store.series(Duration::from_secs(3600));
    assert!(series.iter().all(|p| final_now - p.timestamp_ms <= retention_ms));
    assert_eq!(store.sample_count(), 2 * 361);
}

#[test]
fn duplicate_timestamps_from_many_threads_leave_one_sample() {
    let (store, _) = store();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    store
                        .ingest(&StationId::roquetes(), Reading::Value(20.0 + t as f64), T0)
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.sample_count(), 1);
    let value = store.latest().get(&StationId::roquetes()).unwrap().value.unwrap();
    assert!((20.0..28.0).contains(&value));
}

#[tokio::test]
async fn manual_refresh_and_reads_share_the_store() {
    let (store, clock) = store();
    let source = Arc::new(StaticSource::with_clock(clock.clone()));
    source.set_value(StationId::roquetes(), 30.1);
    source.set_value(StationId::arenosillo(), 29.8);

    let scheduler = RefreshScheduler::builder(store.clone(), source).build().unwrap();

    let reader = {
        let store = store.clone();
        tokio::task::spawn_blocking(move || {
            for _ in 0..1_000 {
                let snapshot = store.latest();
                if let Some(avg) = snapshot.average {
                    assert!((29.8..=30.1).contains(&avg));
                }
            }
        })
    };

    let reports = refresh_three_times(&scheduler).await;
    reader.await.unwrap();

    assert!(reports.iter().all(|r| r.is_complete()));
    let snapshot = store.latest();
    assert!((snapshot.average.unwrap() - 29.95).abs() < 1e-9);
    assert_eq!(snapshot.average_freshness, Freshness::Fresh);
}

async fn refresh_three_times(scheduler: &RefreshScheduler) -> Vec<mufwatch_core::RefreshReport> {
    let (a, b, c) = tokio::join!(
        scheduler.refresh_now(),
        scheduler.refresh_now(),
        scheduler.refresh_now()
    );
    vec![a, b, c]
}
