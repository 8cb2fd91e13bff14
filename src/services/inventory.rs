use serde::Serialize;

use crate::cache::CacheService;
use crate::error::{BookingError, BookingResult};
use crate::models::{Cinema, Hall, Screening, Seat};
use crate::store::BookingStore;

/// Everything the seat picker needs for one screening.
#[derive(Debug, Serialize)]
pub struct SeatMap {
    pub screening: Screening,
    pub hall: Hall,
    pub cinema: Option<Cinema>,
    /// Row, then column.
    pub seats: Vec<Seat>,
    /// Seat ids held by pending or paid orders, ascending.
    pub occupied_seat_ids: Vec<i64>,
}

impl SeatMap {
    pub fn is_occupied(&self, seat_id: i64) -> bool {
        self.occupied_seat_ids.binary_search(&seat_id).is_ok()
    }
}

/// Read-only occupancy view. The hall layout may come from the cache;
/// occupancy is always read from the store.
pub async fn seat_map(
    store: &dyn BookingStore,
    cache: Option<&CacheService>,
    screening_id: i64,
) -> BookingResult<SeatMap> {
    let screening = store
        .find_screening(screening_id)
        .await?
        .ok_or_else(|| BookingError::not_found("screening", screening_id))?;

    let hall = store
        .find_hall(screening.hall_id)
        .await?
        .ok_or_else(|| BookingError::not_found("hall", screening.hall_id))?;
    let cinema = store.find_cinema(hall.cinema_id).await?;

    let seats = match cache {
        Some(cache) => cache.hall_seats(store, hall.id).await?,
        None => store.hall_seats(hall.id).await?,
    };
    let occupied_seat_ids = store.occupied_seat_ids(screening.id).await?;

    Ok(SeatMap { screening, hall, cinema, seats, occupied_seat_ids })
}
