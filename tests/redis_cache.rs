//! Hall layout cache against a live Redis.
//!
//! Run with `REDIS_URL=redis://... cargo test -- --ignored`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use cinema_booking::cache::CacheService;
use cinema_booking::redis_client::RedisClient;
use cinema_booking::store::{BookingStore, MemoryStore};
use common::Fixture;
use redis::AsyncCommands;

#[tokio::test]
#[ignore = "needs Redis at REDIS_URL"]
async fn hall_seats_load_cache_and_fall_back() {
    let url = std::env::var("REDIS_URL").expect("REDIS_URL must point at a test Redis");
    let redis = RedisClient::connect(&url).await.expect("connect");
    let cache = CacheService::new(redis.clone(), 60);
    let fx = Fixture::new().await;
    let key = format!("hall:{}:seats", fx.hall.id);
    cache.invalidate_hall(fx.hall.id).await;

    // miss: read from the store and written back
    let seats = cache.hall_seats(fx.store.as_ref(), fx.hall.id).await.unwrap();
    assert_eq!(seats, fx.seats);
    let mut conn = redis.conn.clone();
    let ttl: i64 = conn.ttl(&key).await.unwrap();
    assert!(ttl > 0 && ttl <= 60);

    // hit: an empty store is never consulted
    let empty = MemoryStore::new();
    assert!(empty.hall_seats(fx.hall.id).await.unwrap().is_empty());
    let cached = cache.hall_seats(&empty, fx.hall.id).await.unwrap();
    assert_eq!(cached, fx.seats);

    // unreadable entry: fall back to the store and repair the key
    let _: () = conn.set(&key, "not json").await.unwrap();
    let repaired = cache.hall_seats(fx.store.as_ref(), fx.hall.id).await.unwrap();
    assert_eq!(repaired, fx.seats);
    let raw: String = conn.get(&key).await.unwrap();
    assert!(raw.starts_with('['));

    // invalidation drops the entry
    cache.invalidate_hall(fx.hall.id).await;
    let gone: Option<String> = conn.get(&key).await.unwrap();
    assert!(gone.is_none());
    assert!(cache.hall_seats(&empty, fx.hall.id).await.unwrap().is_empty());
}
