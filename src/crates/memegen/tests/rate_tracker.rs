use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use memegen::db::{DatabaseConnection, GenerationStore, NewGeneration, SqliteGenerationStore};
use memegen::rate::{
    InMemoryRateBackend, ManualClock, RateBackend, RateError, RatePolicy, RateTracker,
    StoreRateBackend,
};
use std::sync::Arc;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn memory_tracker(limit: u32, clock: Arc<ManualClock>) -> Arc<RateTracker> {
    Arc::new(RateTracker::with_clock(
        Arc::new(InMemoryRateBackend::new()),
        RatePolicy::new(limit, Duration::hours(24)),
        clock,
    ))
}

struct BrokenBackend;

#[async_trait]
impl RateBackend for BrokenBackend {
    async fn usage(&self, _: &str, _: &RatePolicy, _: DateTime<Utc>) -> Result<u32, RateError> {
        Err(RateError::Backend("connection refused".to_string()))
    }

    async fn increment(&self, _: &str, _: &RatePolicy, _: DateTime<Utc>) -> Result<u32, RateError> {
        Err(RateError::Backend("connection refused".to_string()))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

#[tokio::test]
async fn test_unknown_identity_starts_with_full_quota() {
    let tracker = memory_tracker(6, Arc::new(ManualClock::new(start())));

    let info = tracker.admit("203.0.113.7").await;
    assert_eq!(info.remaining, 6);
    assert_eq!(info.limit, 6);
    assert!(!info.is_blocked);
    assert!(info.diagnostic.is_none());
}

#[tokio::test]
async fn test_blocks_after_limit() {
    let tracker = memory_tracker(6, Arc::new(ManualClock::new(start())));

    for expected_remaining in (0..6).rev() {
        let info = tracker.record("u1").await.unwrap();
        assert_eq!(info.remaining, expected_remaining);
    }

    let info = tracker.admit("u1").await;
    assert!(info.is_blocked);
    assert_eq!(info.remaining, 0);
    assert!(tracker.reserve("u1").await.is_err());
    assert!(tracker.reserve("u2").await.is_ok());
}

#[tokio::test]
async fn test_window_expiry_restores_quota() {
    let clock = Arc::new(ManualClock::new(start()));
    let tracker = memory_tracker(2, Arc::clone(&clock));
    tracker.record("u1").await.unwrap();
    tracker.record("u1").await.unwrap();

    clock.advance(Duration::hours(24));
    assert!(tracker.admit("u1").await.is_blocked);

    clock.advance(Duration::seconds(1));
    let info = tracker.admit("u1").await;
    assert!(!info.is_blocked);
    assert_eq!(info.remaining, 2);

    assert_eq!(tracker.record("u1").await.unwrap().remaining, 1);
}

#[tokio::test]
async fn test_failing_backend_admits_with_diagnostic() {
    let tracker = Arc::new(RateTracker::new(
        Arc::new(BrokenBackend),
        RatePolicy::default(),
    ));

    let info = tracker.admit("u1").await;
    assert!(!info.is_blocked);
    assert_eq!(info.remaining, 6);
    assert!(info.diagnostic.unwrap().contains("connection refused"));

    assert!(tracker.reserve("u1").await.is_ok());
    assert!(tracker.record("u1").await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reservations_respect_limit() {
    let clock = Arc::new(ManualClock::new(start()));
    let tracker = memory_tracker(3, clock);
    tracker.record("u1").await.unwrap();
    tracker.record("u1").await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.reserve("u1").await })
        })
        .collect();

    let mut slots = Vec::new();
    for handle in handles {
        if let Ok(slot) = handle.await.unwrap() {
            slots.push(slot);
        }
    }
    assert_eq!(slots.len(), 1);
    assert!(tracker.admit("u1").await.is_blocked);

    // Releasing without committing frees the slot again.
    slots.clear();
    assert_eq!(tracker.admit("u1").await.remaining, 1);
}

#[tokio::test]
async fn test_committed_slot_counts_once() {
    let tracker = memory_tracker(6, Arc::new(ManualClock::new(start())));

    let slot = tracker.reserve("u1").await.unwrap();
    assert_eq!(tracker.admit("u1").await.remaining, 5);

    let info = slot.commit().await.unwrap();
    assert_eq!(info.remaining, 5);
    assert_eq!(tracker.admit("u1").await.remaining, 5);
}

#[tokio::test]
async fn test_store_backend_uses_sliding_window() {
    let db = DatabaseConnection::with_max_connections("sqlite::memory:", 1)
        .await
        .unwrap();
    db.run_migrations().await.unwrap();
    let store: Arc<dyn GenerationStore> = Arc::new(SqliteGenerationStore::new(db));

    let now = start();
    for hours_ago in [30, 20, 2] {
        store
            .insert(
                NewGeneration::new("u1", "p", "https://cdn/a.png")
                    .with_created_at(now - Duration::hours(hours_ago)),
            )
            .await
            .unwrap();
    }

    let clock = Arc::new(ManualClock::new(now));
    let tracker = RateTracker::with_clock(
        Arc::new(StoreRateBackend::new(Arc::clone(&store))),
        RatePolicy::new(2, Duration::hours(24)),
        Arc::clone(&clock) as Arc<dyn memegen::rate::Clock>,
    );
    assert!(tracker.admit("u1").await.is_blocked);

    clock.advance(Duration::hours(5));
    let info = tracker.admit("u1").await;
    assert!(!info.is_blocked);
    assert_eq!(info.remaining, 1);
}
