use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

use super::{BookingStore, SweepReport};
use crate::error::{BookingError, BookingResult};
use crate::models::review::average_rating;
use crate::models::seat::sort_for_display;
use crate::models::{
    order_total, Cinema, Hall, Movie, NewCinema, NewHall, NewMovie, NewReview, NewScreening,
    NewUser, Order, OrderDraft, OrderStatus, PaymentStamp, Review, Screening, ScreeningStatus,
    Seat, User,
};

#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T: Clone> Table<T> {
    fn insert_with(&mut self, build: impl FnOnce(i64) -> T) -> T {
        self.next_id += 1;
        let row = build(self.next_id);
        self.rows.insert(self.next_id, row.clone());
        row
    }

    fn get(&self, id: i64) -> Option<T> {
        self.rows.get(&id).cloned()
    }
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { rows: BTreeMap::new(), next_id: 0 }
    }
}

#[derive(Debug, Clone)]
struct OrderSeatRow {
    order_id: i64,
    seat_id: i64,
}

#[derive(Debug, Default)]
struct Tables {
    users: Table<User>,
    movies: Table<Movie>,
    cinemas: Table<Cinema>,
    halls: Table<Hall>,
    seats: Table<Seat>,
    screenings: Table<Screening>,
    orders: Table<Order>,
    order_seats: Table<OrderSeatRow>,
    reviews: Table<Review>,
}

impl Tables {
    fn occupied(&self, screening_id: i64) -> BTreeSet<i64> {
        let holding: BTreeSet<i64> = self
            .orders
            .rows
            .values()
            .filter(|o| o.screening_id == screening_id && o.status.holds_seats())
            .map(|o| o.id)
            .collect();

        self.order_seats
            .rows
            .values()
            .filter(|os| holding.contains(&os.order_id))
            .map(|os| os.seat_id)
            .collect()
    }

    fn pending_order_of(&self, order_id: i64, user_id: i64) -> BookingResult<Order> {
        let order = self
            .orders
            .get(order_id)
            .ok_or_else(|| BookingError::not_found("order", order_id))?;
        if order.user_id != user_id {
            return Err(BookingError::Forbidden);
        }
        if order.status != OrderStatus::Pending {
            return Err(BookingError::InvalidState { order_id, status: order.status });
        }
        Ok(order)
    }
}

/// In-process store used when no database is configured, and by tests.
///
/// Every operation holds the single lock for its whole duration, which
/// makes each mutation atomic and serializes bookings.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> BookingResult<User> {
        let mut t = self.tables.write().await;
        let taken = t
            .users
            .rows
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(BookingError::validation("username or email already registered"));
        }
        Ok(t.users.insert_with(|id| User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            phone: None,
            real_name: None,
            created_at: now(),
        }))
    }

    async fn find_user_by_login(&self, login: &str) -> BookingResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.rows.values().find(|u| u.matches_login(login)).cloned())
    }

    async fn insert_movie(&self, movie: NewMovie) -> BookingResult<Movie> {
        let mut t = self.tables.write().await;
        Ok(t.movies.insert_with(|id| Movie {
            id,
            title: movie.title,
            director: movie.director,
            actors: movie.actors,
            genre: movie.genre,
            duration_minutes: movie.duration_minutes,
            release_date: movie.release_date,
            description: movie.description,
            poster: movie.poster,
            rating: Decimal::ZERO,
            created_at: now(),
        }))
    }

    async fn find_movie(&self, movie_id: i64) -> BookingResult<Option<Movie>> {
        Ok(self.tables.read().await.movies.get(movie_id))
    }

    async fn list_movies(&self) -> BookingResult<Vec<Movie>> {
        Ok(self.tables.read().await.movies.rows.values().cloned().collect())
    }

    async fn insert_cinema(&self, cinema: NewCinema) -> BookingResult<Cinema> {
        let mut t = self.tables.write().await;
        Ok(t.cinemas.insert_with(|id| Cinema {
            id,
            name: cinema.name,
            address: cinema.address,
            phone: cinema.phone,
        }))
    }

    async fn find_cinema(&self, cinema_id: i64) -> BookingResult<Option<Cinema>> {
        Ok(self.tables.read().await.cinemas.get(cinema_id))
    }

    async fn insert_hall(&self, hall: NewHall) -> BookingResult<Hall> {
        let mut t = self.tables.write().await;
        if t.cinemas.get(hall.cinema_id).is_none() {
            return Err(BookingError::not_found("cinema", hall.cinema_id));
        }

        let layout = hall.seat_layout();
        let created = t.halls.insert_with(|id| Hall {
            id,
            cinema_id: hall.cinema_id,
            name: hall.name.clone(),
            total_seats: hall.total_seats(),
            rows: hall.rows,
            cols: hall.cols,
        });
        for (seat_row, seat_col, class) in layout {
            t.seats.insert_with(|id| Seat { id, hall_id: created.id, seat_row, seat_col, class });
        }
        Ok(created)
    }

    async fn find_hall(&self, hall_id: i64) -> BookingResult<Option<Hall>> {
        Ok(self.tables.read().await.halls.get(hall_id))
    }

    async fn hall_seats(&self, hall_id: i64) -> BookingResult<Vec<Seat>> {
        let t = self.tables.read().await;
        let mut seats: Vec<Seat> =
            t.seats.rows.values().filter(|s| s.hall_id == hall_id).cloned().collect();
        sort_for_display(&mut seats);
        Ok(seats)
    }

    async fn insert_screening(&self, screening: NewScreening) -> BookingResult<Screening> {
        let mut t = self.tables.write().await;
        let hall = t
            .halls
            .get(screening.hall_id)
            .ok_or_else(|| BookingError::not_found("hall", screening.hall_id))?;
        if t.movies.get(screening.movie_id).is_none() {
            return Err(BookingError::not_found("movie", screening.movie_id));
        }
        Ok(t.screenings.insert_with(|id| Screening {
            id,
            movie_id: screening.movie_id,
            hall_id: hall.id,
            start_time: screening.start_time,
            end_time: screening.end_time,
            price: screening.price,
            remaining_seats: hall.total_seats,
            status: ScreeningStatus::Upcoming,
        }))
    }

    async fn find_screening(&self, screening_id: i64) -> BookingResult<Option<Screening>> {
        Ok(self.tables.read().await.screenings.get(screening_id))
    }

    async fn upcoming_screenings(
        &self,
        movie_id: i64,
        after: NaiveDateTime,
    ) -> BookingResult<Vec<Screening>> {
        let t = self.tables.read().await;
        let mut found: Vec<Screening> = t
            .screenings
            .rows
            .values()
            .filter(|s| s.movie_id == movie_id && s.start_time > after)
            .cloned()
            .collect();
        found.sort_by_key(|s| (s.start_time, s.id));
        Ok(found)
    }

    async fn occupied_seat_ids(&self, screening_id: i64) -> BookingResult<Vec<i64>> {
        let t = self.tables.read().await;
        Ok(t.occupied(screening_id).into_iter().collect())
    }

    async fn create_order(&self, draft: OrderDraft) -> BookingResult<Order> {
        draft.ensure_distinct_seats()?;
        let mut t = self.tables.write().await;

        let screening = t
            .screenings
            .get(draft.screening_id)
            .ok_or_else(|| BookingError::not_found("screening", draft.screening_id))?;

        let mut foreign: Vec<i64> = draft
            .seat_ids
            .iter()
            .copied()
            .filter(|id| t.seats.get(*id).map_or(true, |s| s.hall_id != screening.hall_id))
            .collect();
        if !foreign.is_empty() {
            foreign.sort_unstable();
            return Err(BookingError::validation(format!(
                "seats {:?} do not belong to hall {}",
                foreign, screening.hall_id
            )));
        }

        let occupied = t.occupied(screening.id);
        let mut taken: Vec<i64> =
            draft.seat_ids.iter().copied().filter(|id| occupied.contains(id)).collect();
        if !taken.is_empty() {
            taken.sort_unstable();
            return Err(BookingError::SeatUnavailable(taken));
        }

        let seat_count = draft.seat_ids.len();
        let order = t.orders.insert_with(|id| Order {
            id,
            user_id: draft.user_id,
            screening_id: screening.id,
            total_price: order_total(screening.price, seat_count),
            status: OrderStatus::Pending,
            order_time: now(),
            payment_method: None,
            transaction_id: None,
        });
        for seat_id in &draft.seat_ids {
            t.order_seats.insert_with(|_| OrderSeatRow { order_id: order.id, seat_id: *seat_id });
        }
        if let Some(s) = t.screenings.rows.get_mut(&screening.id) {
            s.remaining_seats -= seat_count as i32;
        }
        Ok(order)
    }

    async fn find_order(&self, order_id: i64) -> BookingResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(order_id))
    }

    async fn order_seats(&self, order_id: i64) -> BookingResult<Vec<Seat>> {
        let t = self.tables.read().await;
        let mut seats: Vec<Seat> = t
            .order_seats
            .rows
            .values()
            .filter(|os| os.order_id == order_id)
            .filter_map(|os| t.seats.get(os.seat_id))
            .collect();
        sort_for_display(&mut seats);
        Ok(seats)
    }

    async fn user_orders(&self, user_id: i64) -> BookingResult<Vec<Order>> {
        let t = self.tables.read().await;
        let mut orders: Vec<Order> =
            t.orders.rows.values().filter(|o| o.user_id == user_id).cloned().collect();
        orders.sort_by(|a, b| (b.order_time, b.id).cmp(&(a.order_time, a.id)));
        Ok(orders)
    }

    async fn pay_order(
        &self,
        order_id: i64,
        user_id: i64,
        stamp: PaymentStamp,
    ) -> BookingResult<Order> {
        let mut t = self.tables.write().await;
        t.pending_order_of(order_id, user_id)?;

        let order = t
            .orders
            .rows
            .get_mut(&order_id)
            .ok_or_else(|| BookingError::not_found("order", order_id))?;
        order.status = OrderStatus::Paid;
        order.payment_method = Some(stamp.method);
        order.transaction_id = Some(stamp.transaction_id);
        Ok(order.clone())
    }

    async fn cancel_order(&self, order_id: i64, user_id: i64) -> BookingResult<Order> {
        let mut t = self.tables.write().await;
        let pending = t.pending_order_of(order_id, user_id)?;

        let released =
            t.order_seats.rows.values().filter(|os| os.order_id == order_id).count() as i32;
        if let Some(s) = t.screenings.rows.get_mut(&pending.screening_id) {
            s.remaining_seats += released;
        }

        let order = t
            .orders
            .rows
            .get_mut(&order_id)
            .ok_or_else(|| BookingError::not_found("order", order_id))?;
        order.status = OrderStatus::Cancelled;
        Ok(order.clone())
    }

    async fn purge_screenings_ended_before(
        &self,
        cutoff: NaiveDateTime,
    ) -> BookingResult<SweepReport> {
        let mut t = self.tables.write().await;
        let expired: BTreeSet<i64> = t
            .screenings
            .rows
            .values()
            .filter(|s| s.end_time < cutoff)
            .map(|s| s.id)
            .collect();

        let orders: BTreeSet<i64> = t
            .orders
            .rows
            .values()
            .filter(|o| expired.contains(&o.screening_id))
            .map(|o| o.id)
            .collect();

        let seats_before = t.order_seats.rows.len();
        t.order_seats.rows.retain(|_, os| !orders.contains(&os.order_id));
        let order_seats_deleted = (seats_before - t.order_seats.rows.len()) as u64;

        t.orders.rows.retain(|id, _| !orders.contains(id));
        t.screenings.rows.retain(|id, _| !expired.contains(id));

        Ok(SweepReport {
            screenings_deleted: expired.len() as u64,
            orders_deleted: orders.len() as u64,
            order_seats_deleted,
            failed: 0,
        })
    }

    async fn add_review(&self, review: NewReview) -> BookingResult<(Review, Movie)> {
        let mut t = self.tables.write().await;
        if t.movies.get(review.movie_id).is_none() {
            return Err(BookingError::not_found("movie", review.movie_id));
        }
        let duplicate = t
            .reviews
            .rows
            .values()
            .any(|r| r.movie_id == review.movie_id && r.user_id == review.user_id);
        if duplicate {
            return Err(BookingError::AlreadyReviewed);
        }

        let created = t.reviews.insert_with(|id| Review {
            id,
            user_id: review.user_id,
            movie_id: review.movie_id,
            rating: review.rating,
            content: review.content,
            likes: 0,
            created_at: now(),
        });

        let ratings: Vec<i32> = t
            .reviews
            .rows
            .values()
            .filter(|r| r.movie_id == review.movie_id)
            .map(|r| r.rating)
            .collect();

        let movie = t
            .movies
            .rows
            .get_mut(&review.movie_id)
            .ok_or_else(|| BookingError::not_found("movie", review.movie_id))?;
        movie.rating = average_rating(&ratings);
        Ok((created, movie.clone()))
    }

    async fn movie_reviews(&self, movie_id: i64) -> BookingResult<Vec<Review>> {
        let t = self.tables.read().await;
        let mut reviews: Vec<Review> =
            t.reviews.rows.values().filter(|r| r.movie_id == movie_id).cloned().collect();
        reviews.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(reviews)
    }
}
