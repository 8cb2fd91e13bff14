//! Persistence seam for the booking core.
//!
//! Every operation that mutates more than one row is atomic inside the
//! implementation: callers never see a half-written order or a screening
//! whose orders were only partly removed.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::BookingResult;
use crate::models::{
    Cinema, Hall, Movie, NewCinema, NewHall, NewMovie, NewReview, NewScreening, NewUser, Order,
    OrderDraft, PaymentStamp, Review, Screening, Seat, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Итог одного прохода очистки.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub screenings_deleted: u64,
    pub orders_deleted: u64,
    pub order_seats_deleted: u64,
    pub failed: u64,
}

impl SweepReport {
    pub fn absorb(&mut self, other: SweepReport) {
        self.screenings_deleted += other.screenings_deleted;
        self.orders_deleted += other.orders_deleted;
        self.order_seats_deleted += other.order_seats_deleted;
        self.failed += other.failed;
    }
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /* ---------- catalog ---------- */

    async fn insert_user(&self, user: NewUser) -> BookingResult<User>;

    /// Finds a user by username or e-mail.
    async fn find_user_by_login(&self, login: &str) -> BookingResult<Option<User>>;

    async fn insert_movie(&self, movie: NewMovie) -> BookingResult<Movie>;

    async fn find_movie(&self, movie_id: i64) -> BookingResult<Option<Movie>>;

    /// Whole catalog in creation order.
    async fn list_movies(&self) -> BookingResult<Vec<Movie>>;

    async fn insert_cinema(&self, cinema: NewCinema) -> BookingResult<Cinema>;

    async fn find_cinema(&self, cinema_id: i64) -> BookingResult<Option<Cinema>>;

    /// Creates the hall together with its full seat grid.
    async fn insert_hall(&self, hall: NewHall) -> BookingResult<Hall>;

    async fn find_hall(&self, hall_id: i64) -> BookingResult<Option<Hall>>;

    /// Seats of a hall ordered by row, then column.
    async fn hall_seats(&self, hall_id: i64) -> BookingResult<Vec<Seat>>;

    /// Starts with `remaining_seats` equal to the hall's capacity.
    async fn insert_screening(&self, screening: NewScreening) -> BookingResult<Screening>;

    async fn find_screening(&self, screening_id: i64) -> BookingResult<Option<Screening>>;

    /// Screenings of a movie starting after `after`, earliest first.
    async fn upcoming_screenings(
        &self,
        movie_id: i64,
        after: NaiveDateTime,
    ) -> BookingResult<Vec<Screening>>;

    /* ---------- occupancy ---------- */

    /// Seat ids held by pending or paid orders of the screening, ascending.
    async fn occupied_seat_ids(&self, screening_id: i64) -> BookingResult<Vec<i64>>;

    /* ---------- orders ---------- */

    /// Atomically checks the seats and writes a pending order, its seat rows
    /// and the decremented counter.
    ///
    /// Errors: `NotFound` for an unknown screening, `Validation` for seats
    /// outside the screening's hall, `SeatUnavailable` for seats already held.
    async fn create_order(&self, draft: OrderDraft) -> BookingResult<Order>;

    async fn find_order(&self, order_id: i64) -> BookingResult<Option<Order>>;

    /// Seats of an order in display order.
    async fn order_seats(&self, order_id: i64) -> BookingResult<Vec<Seat>>;

    /// Orders of a user, newest first.
    async fn user_orders(&self, user_id: i64) -> BookingResult<Vec<Order>>;

    /// pending -> paid. `Forbidden` if `user_id` is not the owner,
    /// `InvalidState` if the order is not pending.
    async fn pay_order(
        &self,
        order_id: i64,
        user_id: i64,
        stamp: PaymentStamp,
    ) -> BookingResult<Order>;

    /// pending -> cancelled, releasing the seats and restoring the counter.
    async fn cancel_order(&self, order_id: i64, user_id: i64) -> BookingResult<Order>;

    /* ---------- expiration ---------- */

    /// Hard-deletes every screening with `end_time < cutoff` together with
    /// its orders and order seats, one screening per transaction.
    async fn purge_screenings_ended_before(
        &self,
        cutoff: NaiveDateTime,
    ) -> BookingResult<SweepReport>;

    /* ---------- reviews ---------- */

    /// Inserts the review and recomputes the movie's average rating in the
    /// same transaction. `AlreadyReviewed` on a second review by one user.
    async fn add_review(&self, review: NewReview) -> BookingResult<(Review, Movie)>;

    /// Reviews of a movie, newest first.
    async fn movie_reviews(&self, movie_id: i64) -> BookingResult<Vec<Review>>;
}
