use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{error, info, warn};

use super::{BookingStore, SweepReport};
use crate::database::Database;
use crate::error::{is_unique_violation, BookingError, BookingResult};
use crate::models::review::average_rating;
use crate::models::{
    order_total, Cinema, Hall, Movie, NewCinema, NewHall, NewMovie, NewReview, NewScreening,
    NewUser, Order, OrderDraft, OrderStatus, PaymentStamp, Review, Screening, Seat, User,
};

const USER_COLUMNS: &str = "id, username, email, password_hash, phone, real_name, created_at";
const MOVIE_COLUMNS: &str = "id, title, director, actors, genre, duration_minutes, release_date, \
                             description, poster, rating, created_at";
const HALL_COLUMNS: &str = "id, cinema_id, name, total_seats, rows, cols";
const SEAT_COLUMNS: &str = "s.id, s.hall_id, s.seat_row, s.seat_col, s.class";
const SCREENING_COLUMNS: &str =
    "id, movie_id, hall_id, start_time, end_time, price, remaining_seats, status";
const ORDER_COLUMNS: &str = "id, user_id, screening_id, total_price, status, order_time, \
                             payment_method, transaction_id";
const REVIEW_COLUMNS: &str = "id, user_id, movie_id, rating, content, likes, created_at";

// Seats sort by row label length first so that "Z" precedes "AA".
const SEAT_ORDER: &str = "LENGTH(s.seat_row), s.seat_row, s.seat_col";

/// Postgres implementation of [`BookingStore`].
///
/// Booking, cancellation and expiry all take the screening row lock
/// (`FOR UPDATE`) before touching its orders, so they serialize per
/// screening and always lock in the same order.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool.clone() }
    }

    async fn lock_screening(
        tx: &mut Transaction<'_, Postgres>,
        screening_id: i64,
    ) -> BookingResult<Screening> {
        sqlx::query_as::<_, Screening>(&format!(
            "SELECT {SCREENING_COLUMNS} FROM screenings WHERE id = $1 FOR UPDATE"
        ))
        .bind(screening_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| BookingError::not_found("screening", screening_id))
    }

    /// Locks a pending order owned by `user_id`. The screening row is locked
    /// first, then the order row is re-read under lock.
    async fn lock_pending_order(
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
        user_id: i64,
    ) -> BookingResult<Order> {
        let screening_id: i64 =
            sqlx::query_scalar("SELECT screening_id FROM orders WHERE id = $1")
                .bind(order_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| BookingError::not_found("order", order_id))?;

        Self::lock_screening(tx, screening_id).await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| BookingError::not_found("order", order_id))?;

        if order.user_id != user_id {
            return Err(BookingError::Forbidden);
        }
        if order.status != OrderStatus::Pending {
            return Err(BookingError::InvalidState { order_id, status: order.status });
        }
        Ok(order)
    }

    async fn purge_screening(&self, screening_id: i64) -> BookingResult<SweepReport> {
        let mut tx = self.pool.begin().await?;

        // Строку могли удалить параллельно; тогда просто пропускаем.
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM screenings WHERE id = $1 FOR UPDATE")
                .bind(screening_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(SweepReport::default());
        }

        let order_seats = sqlx::query(
            "DELETE FROM order_seats
             WHERE order_id IN (SELECT id FROM orders WHERE screening_id = $1)",
        )
        .bind(screening_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let orders = sqlx::query("DELETE FROM orders WHERE screening_id = $1")
            .bind(screening_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let screenings = sqlx::query("DELETE FROM screenings WHERE id = $1")
            .bind(screening_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(SweepReport {
            screenings_deleted: screenings,
            orders_deleted: orders,
            order_seats_deleted: order_seats,
            failed: 0,
        })
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> BookingResult<User> {
        let row = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_user_by_login(&self, login: &str) -> BookingResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1 LIMIT 1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_movie(&self, movie: NewMovie) -> BookingResult<Movie> {
        let row = sqlx::query_as::<_, Movie>(&format!(
            "INSERT INTO movies
                (title, director, actors, genre, duration_minutes, release_date, description, poster)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(&movie.title)
        .bind(&movie.director)
        .bind(&movie.actors)
        .bind(&movie.genre)
        .bind(movie.duration_minutes)
        .bind(movie.release_date)
        .bind(&movie.description)
        .bind(&movie.poster)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_movie(&self, movie_id: i64) -> BookingResult<Option<Movie>> {
        let row = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"
        ))
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_movies(&self) -> BookingResult<Vec<Movie>> {
        let rows = sqlx::query_as::<_, Movie>(&format!("SELECT {MOVIE_COLUMNS} FROM movies ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert_cinema(&self, cinema: NewCinema) -> BookingResult<Cinema> {
        let row = sqlx::query_as::<_, Cinema>(
            "INSERT INTO cinemas (name, address, phone)
             VALUES ($1, $2, $3)
             RETURNING id, name, address, phone",
        )
        .bind(&cinema.name)
        .bind(&cinema.address)
        .bind(&cinema.phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_cinema(&self, cinema_id: i64) -> BookingResult<Option<Cinema>> {
        let row = sqlx::query_as::<_, Cinema>(
            "SELECT id, name, address, phone FROM cinemas WHERE id = $1",
        )
        .bind(cinema_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_hall(&self, hall: NewHall) -> BookingResult<Hall> {
        let layout = hall.seat_layout();
        let rows: Vec<String> = layout.iter().map(|(row, _, _)| row.clone()).collect();
        let cols: Vec<i32> = layout.iter().map(|(_, col, _)| *col).collect();
        let classes: Vec<&str> = layout.iter().map(|(_, _, class)| class.as_str()).collect();

        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Hall>(&format!(
            "INSERT INTO halls (cinema_id, name, total_seats, rows, cols)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {HALL_COLUMNS}"
        ))
        .bind(hall.cinema_id)
        .bind(&hall.name)
        .bind(hall.total_seats())
        .bind(hall.rows)
        .bind(hall.cols)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO seats (hall_id, seat_row, seat_col, class)
             SELECT $1, t.r, t.c, t.k::seat_class
             FROM UNNEST($2::text[], $3::int[], $4::text[]) AS t(r, c, k)",
        )
        .bind(created.id)
        .bind(&rows)
        .bind(&cols)
        .bind(&classes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn find_hall(&self, hall_id: i64) -> BookingResult<Option<Hall>> {
        let row = sqlx::query_as::<_, Hall>(&format!(
            "SELECT {HALL_COLUMNS} FROM halls WHERE id = $1"
        ))
        .bind(hall_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn hall_seats(&self, hall_id: i64) -> BookingResult<Vec<Seat>> {
        let rows = sqlx::query_as::<_, Seat>(&format!(
            "SELECT {SEAT_COLUMNS} FROM seats s WHERE s.hall_id = $1 ORDER BY {SEAT_ORDER}"
        ))
        .bind(hall_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_screening(&self, screening: NewScreening) -> BookingResult<Screening> {
        let row = sqlx::query_as::<_, Screening>(&format!(
            "INSERT INTO screenings (movie_id, hall_id, start_time, end_time, price, remaining_seats)
             SELECT $1, h.id, $3, $4, $5, h.total_seats FROM halls h WHERE h.id = $2
             RETURNING {SCREENING_COLUMNS}"
        ))
        .bind(screening.movie_id)
        .bind(screening.hall_id)
        .bind(screening.start_time)
        .bind(screening.end_time)
        .bind(screening.price)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| BookingError::not_found("hall", screening.hall_id))
    }

    async fn find_screening(&self, screening_id: i64) -> BookingResult<Option<Screening>> {
        let row = sqlx::query_as::<_, Screening>(&format!(
            "SELECT {SCREENING_COLUMNS} FROM screenings WHERE id = $1"
        ))
        .bind(screening_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upcoming_screenings(
        &self,
        movie_id: i64,
        after: NaiveDateTime,
    ) -> BookingResult<Vec<Screening>> {
        let rows = sqlx::query_as::<_, Screening>(&format!(
            "SELECT {SCREENING_COLUMNS} FROM screenings
             WHERE movie_id = $1 AND start_time > $2
             ORDER BY start_time, id"
        ))
        .bind(movie_id)
        .bind(after)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn occupied_seat_ids(&self, screening_id: i64) -> BookingResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT os.seat_id
             FROM order_seats os
             JOIN orders o ON o.id = os.order_id
             WHERE o.screening_id = $1 AND o.status IN ('pending', 'paid')
             ORDER BY os.seat_id",
        )
        .bind(screening_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn create_order(&self, draft: OrderDraft) -> BookingResult<Order> {
        draft.ensure_distinct_seats()?;
        let mut tx = self.pool.begin().await?;

        // Блокировка строки сеанса сериализует все бронирования на этот сеанс.
        let screening = Self::lock_screening(&mut tx, draft.screening_id).await?;

        let in_hall: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM seats WHERE hall_id = $1 AND id = ANY($2)",
        )
        .bind(screening.hall_id)
        .bind(&draft.seat_ids)
        .fetch_all(&mut *tx)
        .await?;

        if in_hall.len() != draft.seat_ids.len() {
            let mut foreign: Vec<i64> = draft
                .seat_ids
                .iter()
                .copied()
                .filter(|id| !in_hall.contains(id))
                .collect();
            foreign.sort_unstable();
            return Err(BookingError::validation(format!(
                "seats {:?} do not belong to hall {}",
                foreign, screening.hall_id
            )));
        }

        let taken: Vec<i64> = sqlx::query_scalar(
            "SELECT os.seat_id
             FROM order_seats os
             JOIN orders o ON o.id = os.order_id
             WHERE o.screening_id = $1
               AND o.status IN ('pending', 'paid')
               AND os.seat_id = ANY($2)
             ORDER BY os.seat_id",
        )
        .bind(screening.id)
        .bind(&draft.seat_ids)
        .fetch_all(&mut *tx)
        .await?;

        if !taken.is_empty() {
            return Err(BookingError::SeatUnavailable(taken));
        }

        let seat_count = draft.seat_ids.len();
        let total = order_total(screening.price, seat_count);

        let order = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (user_id, screening_id, total_price, status, order_time)
             VALUES ($1, $2, $3, 'pending', NOW() AT TIME ZONE 'utc')
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(draft.user_id)
        .bind(screening.id)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        let inserted = sqlx::query(
            "INSERT INTO order_seats (order_id, seat_id, screening_id)
             SELECT $1, UNNEST($2::bigint[]), $3",
        )
        .bind(order.id)
        .bind(&draft.seat_ids)
        .bind(screening.id)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if is_unique_violation(&e) {
                warn!("seat claim collided on unique index for screening {}", screening.id);
                return Err(BookingError::SeatUnavailable(draft.seat_ids));
            }
            return Err(e.into());
        }

        sqlx::query("UPDATE screenings SET remaining_seats = remaining_seats - $2 WHERE id = $1")
            .bind(screening.id)
            .bind(seat_count as i32)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn find_order(&self, order_id: i64) -> BookingResult<Option<Order>> {
        let row = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn order_seats(&self, order_id: i64) -> BookingResult<Vec<Seat>> {
        let rows = sqlx::query_as::<_, Seat>(&format!(
            "SELECT {SEAT_COLUMNS}
             FROM order_seats os
             JOIN seats s ON s.id = os.seat_id
             WHERE os.order_id = $1
             ORDER BY {SEAT_ORDER}"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn user_orders(&self, user_id: i64) -> BookingResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY order_time DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn pay_order(
        &self,
        order_id: i64,
        user_id: i64,
        stamp: PaymentStamp,
    ) -> BookingResult<Order> {
        let mut tx = self.pool.begin().await?;
        Self::lock_pending_order(&mut tx, order_id, user_id).await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders
             SET status = 'paid', payment_method = $2, transaction_id = $3
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .bind(&stamp.method)
        .bind(&stamp.transaction_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn cancel_order(&self, order_id: i64, user_id: i64) -> BookingResult<Order> {
        let mut tx = self.pool.begin().await?;
        let pending = Self::lock_pending_order(&mut tx, order_id, user_id).await?;

        let released = sqlx::query(
            "UPDATE order_seats SET released = TRUE WHERE order_id = $1 AND NOT released",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("UPDATE screenings SET remaining_seats = remaining_seats + $2 WHERE id = $1")
            .bind(pending.screening_id)
            .bind(released as i32)
            .execute(&mut *tx)
            .await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = 'cancelled' WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn purge_screenings_ended_before(
        &self,
        cutoff: NaiveDateTime,
    ) -> BookingResult<SweepReport> {
        let expired: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM screenings WHERE end_time < $1 ORDER BY id")
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await?;

        let mut report = SweepReport::default();
        for screening_id in expired {
            match self.purge_screening(screening_id).await {
                Ok(part) => report.absorb(part),
                Err(e) => {
                    error!("failed to purge screening {}: {:?}", screening_id, e);
                    report.failed += 1;
                }
            }
        }

        if report.screenings_deleted > 0 {
            info!(
                "purged {} screenings, {} orders, {} order seats",
                report.screenings_deleted, report.orders_deleted, report.order_seats_deleted
            );
        }
        Ok(report)
    }

    async fn add_review(&self, review: NewReview) -> BookingResult<(Review, Movie)> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> =
            sqlx::query_scalar("SELECT id FROM movies WHERE id = $1 FOR UPDATE")
                .bind(review.movie_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(BookingError::not_found("movie", review.movie_id));
        }

        let inserted = sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews (user_id, movie_id, rating, content, created_at)
             VALUES ($1, $2, $3, $4, NOW() AT TIME ZONE 'utc')
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(review.user_id)
        .bind(review.movie_id)
        .bind(review.rating)
        .bind(&review.content)
        .fetch_one(&mut *tx)
        .await;

        let created = match inserted {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => return Err(BookingError::AlreadyReviewed),
            Err(e) => return Err(e.into()),
        };

        let ratings: Vec<i32> = sqlx::query_scalar("SELECT rating FROM reviews WHERE movie_id = $1")
            .bind(review.movie_id)
            .fetch_all(&mut *tx)
            .await?;

        let movie = sqlx::query_as::<_, Movie>(&format!(
            "UPDATE movies SET rating = $2 WHERE id = $1 RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(review.movie_id)
        .bind(average_rating(&ratings))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((created, movie))
    }

    async fn movie_reviews(&self, movie_id: i64) -> BookingResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE movie_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
