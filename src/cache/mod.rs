//! Redis cache for hall seat layouts.
//!
//! Seats never change after a hall is created, so the ordered seat list of
//! a hall can be cached indefinitely (bounded by a TTL to pick up manual
//! fixes). Occupancy is never cached: it is read from the store on every
//! request.

use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::error::BookingResult;
use crate::models::Seat;
use crate::redis_client::RedisClient;
use crate::store::BookingStore;

#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    ttl_seconds: u64,
}

fn hall_seats_key(hall_id: i64) -> String {
    format!("hall:{}:seats", hall_id)
}

impl CacheService {
    pub fn new(redis: RedisClient, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    /// Seat list of a hall, from Redis if present, otherwise from the store.
    /// Redis failures degrade to a store read.
    pub async fn hall_seats(&self, store: &dyn BookingStore, hall_id: i64) -> BookingResult<Vec<Seat>> {
        match self.cached_hall_seats(hall_id).await {
            Ok(Some(seats)) => {
                debug!("hall {} seats served from cache", hall_id);
                return Ok(seats);
            }
            Ok(None) => {}
            Err(e) => warn!("seat cache read failed for hall {}: {:?}", hall_id, e),
        }

        let seats = store.hall_seats(hall_id).await?;
        if !seats.is_empty() {
            if let Err(e) = self.save_hall_seats(hall_id, &seats).await {
                warn!("seat cache write failed for hall {}: {:?}", hall_id, e);
            }
        }
        Ok(seats)
    }

    pub async fn invalidate_hall(&self, hall_id: i64) {
        let mut conn = self.redis.conn.clone();
        let res: Result<(), redis::RedisError> = conn.del(hall_seats_key(hall_id)).await;
        if let Err(e) = res {
            warn!("failed to invalidate seat cache for hall {}: {:?}", hall_id, e);
        }
    }

    // === Работа с кешем ===
    async fn cached_hall_seats(&self, hall_id: i64) -> Result<Option<Vec<Seat>>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(hall_seats_key(hall_id)).await?;
        match data {
            Some(json) => {
                let seats = serde_json::from_str(&json).map_err(|_| {
                    redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
                })?;
                Ok(Some(seats))
            }
            None => Ok(None),
        }
    }

    async fn save_hall_seats(&self, hall_id: i64, seats: &[Seat]) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(seats).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(hall_seats_key(hall_id), data, self.ttl_seconds).await
    }
}
