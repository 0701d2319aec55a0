// Browser pool behavior: caps, recycling thresholds, memory-pressure
// eviction, and shutdown, all against the in-memory mock engine.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use common::{MockBehavior, mock_factory, mock_factory_with};
use stealthswarm::{BrowserPool, MemoryProbe, SwarmConfig, SwarmError};

fn small_config(max_browsers: usize) -> SwarmConfig {
    SwarmConfig::builder()
        .max_browsers(max_browsers)
        .build()
        .expect("test config must build")
}

#[tokio::test]
async fn test_cap_is_never_exceeded() {
    let (factory, stats) = mock_factory();
    let pool = BrowserPool::new(small_config(2), factory);

    let first = pool.acquire().await.expect("first acquire");
    let second = pool.acquire().await.expect("second acquire");
    assert_ne!(first.id, second.id);

    // At cap with both in use: fail fast, no blocking, no new launch.
    let err = pool.acquire().await.expect_err("third acquire must fail");
    assert!(matches!(err, SwarmError::Capacity { .. }));
    assert_eq!(stats.engines_launched.load(Ordering::SeqCst), 2);

    let snapshot = pool.stats().await;
    assert_eq!(snapshot.browsers_live, 2);
}

#[tokio::test]
async fn test_release_round_trip_reuses_same_browser() {
    let (factory, stats) = mock_factory();
    let pool = BrowserPool::new(small_config(3), factory);

    let lease = pool.acquire().await.expect("acquire");
    let id = lease.id.clone();
    pool.release(&id, false).await;

    let again = pool.acquire().await.expect("re-acquire");
    assert_eq!(again.id, id, "a healthy released browser is handed back");
    assert_eq!(
        stats.engines_launched.load(Ordering::SeqCst),
        1,
        "reuse must not launch a new engine"
    );
}

#[tokio::test]
async fn test_task_threshold_recycles_browser() {
    // max_browsers=1, recycle after 2 tasks: the second release retires
    // the browser and the next acquire gets a fresh id.
    let config = SwarmConfig::builder()
        .max_browsers(1)
        .browser_max_tasks(2)
        .build()
        .expect("config");
    let (factory, stats) = mock_factory();
    let pool = BrowserPool::new(config, factory);

    let first = pool.acquire().await.expect("acquire");
    let first_id = first.id.clone();
    pool.release(&first_id, false).await;

    let second = pool.acquire().await.expect("re-acquire");
    assert_eq!(second.id, first_id);
    pool.release(&first_id, false).await;

    let third = pool.acquire().await.expect("acquire after recycle");
    assert_ne!(third.id, first_id, "threshold-hit browser must not return");

    let snapshot = pool.stats().await;
    assert_eq!(snapshot.browsers_recycled, 1);
    assert_eq!(stats.engines_closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_error_threshold_recycles_browser() {
    let config = SwarmConfig::builder()
        .max_browsers(1)
        .browser_max_errors(1)
        .build()
        .expect("config");
    let (factory, _stats) = mock_factory();
    let pool = BrowserPool::new(config, factory);

    let lease = pool.acquire().await.expect("acquire");
    let id = lease.id.clone();
    pool.release(&id, true).await;

    assert_eq!(pool.stats().await.browsers_recycled, 1);
    let next = pool.acquire().await.expect("acquire after error recycle");
    assert_ne!(next.id, id);
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let (factory, stats) = mock_factory();
    let pool = BrowserPool::new(small_config(10), factory);

    pool.start().await.expect("first start");
    pool.start().await.expect("second start");

    // Pre-warm is min(3, max_browsers), once.
    assert_eq!(stats.engines_launched.load(Ordering::SeqCst), 3);
    assert_eq!(pool.stats().await.browsers_available, 3);
}

#[tokio::test]
async fn test_prewarm_respects_small_cap() {
    let (factory, stats) = mock_factory();
    let pool = BrowserPool::new(small_config(1), factory);

    pool.start().await.expect("start");
    assert_eq!(stats.engines_launched.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_launch_failure_propagates_and_inserts_nothing() {
    let (factory, _stats) = mock_factory_with(MockBehavior {
        fail_launch: true,
        ..MockBehavior::default()
    });
    let pool = BrowserPool::new(small_config(2), factory);

    let err = pool.acquire().await.expect_err("launch must fail");
    assert!(matches!(err, SwarmError::Creation { .. }));
    assert_eq!(pool.stats().await.browsers_live, 0);
    assert_eq!(pool.stats().await.browsers_created, 0);
}

#[tokio::test]
async fn test_memory_pressure_evicts_oldest_available() {
    let memory_used = Arc::new(AtomicU64::new(100));
    let probe: MemoryProbe = {
        let memory_used = Arc::clone(&memory_used);
        Arc::new(move || memory_used.load(Ordering::SeqCst))
    };

    let config = SwarmConfig::builder()
        .max_browsers(3)
        .memory_limit_mb(500)
        .build()
        .expect("config");
    let (factory, _stats) = mock_factory();
    let pool = BrowserPool::with_memory_probe(config, factory, probe);

    let first = pool.acquire().await.expect("first");
    let first_id = first.id.clone();
    let second = pool.acquire().await.expect("second");
    let second_id = second.id.clone();
    pool.release(&first_id, false).await;
    pool.release(&second_id, false).await;

    // Cross the ceiling: the next acquire must retire exactly the oldest
    // available browser, then hand out the survivor.
    memory_used.store(900, Ordering::SeqCst);
    let lease = pool.acquire().await.expect("acquire under pressure");

    assert_eq!(lease.id, second_id, "younger browser survives eviction");
    let snapshot = pool.stats().await;
    assert_eq!(snapshot.browsers_recycled, 1);
    assert_eq!(snapshot.browsers_live, 1);
}

#[tokio::test]
async fn test_memory_pressure_skips_busy_browsers() {
    let probe: MemoryProbe = Arc::new(|| u64::MAX);
    let config = SwarmConfig::builder()
        .max_browsers(2)
        .memory_limit_mb(1)
        .build()
        .expect("config");
    let (factory, _stats) = mock_factory();
    let pool = BrowserPool::with_memory_probe(config, factory, probe);

    // Only browser is in use: nothing evictable, acquire still proceeds
    // to create under the cap.
    let _held = pool.acquire().await.expect("first");
    let _second = pool.acquire().await.expect("second despite pressure");
    assert_eq!(pool.stats().await.browsers_recycled, 0);
}

#[tokio::test]
async fn test_stop_closes_everything_and_is_idempotent() {
    let (factory, stats) = mock_factory();
    let pool = BrowserPool::new(small_config(5), factory);

    pool.start().await.expect("start");
    let _held = pool.acquire().await.expect("acquire");

    pool.stop(Duration::from_secs(1)).await;
    // In-use browsers close too.
    assert_eq!(stats.engines_closed.load(Ordering::SeqCst), 3);
    assert_eq!(pool.stats().await.browsers_live, 0);

    pool.stop(Duration::from_secs(1)).await;
    assert_eq!(stats.engines_closed.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_stop_swallows_close_failures() {
    let (factory, stats) = mock_factory_with(MockBehavior {
        fail_close: true,
        ..MockBehavior::default()
    });
    let pool = BrowserPool::new(small_config(3), factory);

    pool.start().await.expect("start");
    pool.stop(Duration::from_secs(1)).await;

    assert_eq!(stats.engines_closed.load(Ordering::SeqCst), 3);
    assert_eq!(pool.stats().await.browsers_live, 0);
}

#[tokio::test]
async fn test_release_of_unknown_id_is_ignored() {
    let (factory, _stats) = mock_factory();
    let pool = BrowserPool::new(small_config(1), factory);

    pool.release("not-a-browser", false).await;
    assert_eq!(pool.stats().await.browsers_live, 0);
}
