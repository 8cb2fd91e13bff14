#![allow(dead_code)]

use chrono::{Duration, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use cinema_booking::models::{
    Hall, Movie, NewCinema, NewHall, NewMovie, NewScreening, NewUser, Screening, Seat, User,
};
use cinema_booking::store::{BookingStore, MemoryStore};

pub const PASSWORD: &str = "correct horse";

/// One cinema, hall "1" with seats A1..A10, a movie and a screening
/// tomorrow at 50.00, plus two users.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub hall: Hall,
    pub seats: Vec<Seat>,
    pub movie: Movie,
    pub screening: Screening,
    pub alice: User,
    pub bob: User,
}

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn price() -> Decimal {
    Decimal::new(5000, 2)
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());

        let cinema = store
            .insert_cinema(NewCinema { name: "Test".into(), address: "Main st".into(), phone: None })
            .await
            .unwrap();
        let hall = store
            .insert_hall(NewHall { cinema_id: cinema.id, name: "1".into(), rows: 1, cols: 10 })
            .await
            .unwrap();
        let seats = store.hall_seats(hall.id).await.unwrap();
        let movie = store
            .insert_movie(NewMovie { title: "Test Movie".into(), duration_minutes: 120, ..NewMovie::default() })
            .await
            .unwrap();

        let start = now() + Duration::days(1);
        let screening = store
            .insert_screening(NewScreening {
                movie_id: movie.id,
                hall_id: hall.id,
                start_time: start,
                end_time: start + Duration::hours(2),
                price: price(),
            })
            .await
            .unwrap();

        let alice = store
            .insert_user(NewUser::with_password("alice", "alice@example.com", PASSWORD, 4).unwrap())
            .await
            .unwrap();
        let bob = store
            .insert_user(NewUser::with_password("bob", "bob@example.com", PASSWORD, 4).unwrap())
            .await
            .unwrap();

        Fixture { store, hall, seats, movie, screening, alice, bob }
    }

    /// Seat id by label, e.g. "A3".
    pub fn seat(&self, label: &str) -> i64 {
        self.seats
            .iter()
            .find(|s| s.label() == label)
            .map(|s| s.id)
            .unwrap_or_else(|| panic!("no seat {}", label))
    }

    pub fn seats_of(&self, labels: &[&str]) -> Vec<i64> {
        labels.iter().map(|l| self.seat(l)).collect()
    }

    pub async fn remaining(&self) -> i32 {
        self.store
            .find_screening(self.screening.id)
            .await
            .unwrap()
            .unwrap()
            .remaining_seats
    }

    /// total seats - remaining == seats held by pending/paid orders.
    pub async fn assert_counter_consistent(&self) {
        let held = self.store.occupied_seat_ids(self.screening.id).await.unwrap().len() as i32;
        assert_eq!(self.hall.total_seats - self.remaining().await, held);
    }

    /// Screening of the same movie in the same hall with an explicit window.
    pub async fn screening_ending_at(&self, end_time: NaiveDateTime) -> Screening {
        self.store
            .insert_screening(NewScreening {
                movie_id: self.movie.id,
                hall_id: self.hall.id,
                start_time: end_time - Duration::hours(2),
                end_time,
                price: price(),
            })
            .await
            .unwrap()
    }
}
