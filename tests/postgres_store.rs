//! PgStore against a live database.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.
//! Every test builds its own cinema, hall and users, so runs can share a
//! database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{Duration, Utc};
use cinema_booking::config::Config;
use cinema_booking::database::Database;
use cinema_booking::error::BookingError;
use cinema_booking::models::{
    NewCinema, NewHall, NewMovie, NewReview, NewScreening, NewUser, OrderDraft, OrderStatus,
    PaymentStamp, Screening, Seat, User,
};
use cinema_booking::store::{BookingStore, PgStore};
use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;

struct Pg {
    store: Arc<PgStore>,
    screening: Screening,
    seats: Vec<Seat>,
    users: Vec<User>,
}

async fn setup(user_count: usize) -> Pg {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let db = Database::connect(&url, &Config::default().database).await.expect("connect");
    db.run_migrations().await.expect("migrations");
    let store = Arc::new(PgStore::new(&db));

    let tag = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let cinema = store
        .insert_cinema(NewCinema { name: format!("pg-{}", tag), address: "test".into(), phone: None })
        .await
        .unwrap();
    let hall = store
        .insert_hall(NewHall { cinema_id: cinema.id, name: "1".into(), rows: 2, cols: 5 })
        .await
        .unwrap();
    let seats = store.hall_seats(hall.id).await.unwrap();
    let movie = store
        .insert_movie(NewMovie { title: format!("pg-{}", tag), duration_minutes: 90, ..NewMovie::default() })
        .await
        .unwrap();
    let start = Utc::now().naive_utc() + Duration::days(1);
    let screening = store
        .insert_screening(NewScreening {
            movie_id: movie.id,
            hall_id: hall.id,
            start_time: start,
            end_time: start + Duration::minutes(90),
            price: Decimal::new(6000, 2),
        })
        .await
        .unwrap();

    let mut users = Vec::new();
    for i in 0..user_count {
        let name = format!("pg{}u{}", tag, i);
        let user = store
            .insert_user(NewUser::with_password(&name, &format!("{}@test.local", name), "pw", 4).unwrap())
            .await
            .unwrap();
        users.push(user);
    }

    Pg { store, screening, seats, users }
}

fn draft(pg: &Pg, user: usize, seats: &[usize]) -> OrderDraft {
    OrderDraft {
        user_id: pg.users[user].id,
        screening_id: pg.screening.id,
        seat_ids: seats.iter().map(|i| pg.seats[*i].id).collect(),
    }
}

async fn remaining(pg: &Pg) -> i32 {
    pg.store.find_screening(pg.screening.id).await.unwrap().unwrap().remaining_seats
}

#[tokio::test]
#[ignore = "needs Postgres at DATABASE_URL"]
async fn hall_layout_is_row_major() {
    let pg = setup(0).await;
    let labels: Vec<String> = pg.seats.iter().map(|s| s.label()).collect();
    assert_eq!(labels, ["A1", "A2", "A3", "A4", "A5", "B1", "B2", "B3", "B4", "B5"]);
    assert_eq!(pg.screening.remaining_seats, 10);
}

#[tokio::test]
#[ignore = "needs Postgres at DATABASE_URL"]
async fn book_pay_cancel_lifecycle() {
    let pg = setup(2).await;

    let order = pg.store.create_order(draft(&pg, 0, &[0, 1])).await.unwrap();
    assert_eq!(order.total_price, Decimal::new(12000, 2));
    assert_eq!(remaining(&pg).await, 8);

    let err = pg.store.create_order(draft(&pg, 1, &[1, 2])).await.unwrap_err();
    assert!(matches!(err, BookingError::SeatUnavailable(ref ids) if ids == &vec![pg.seats[1].id]));
    assert_eq!(remaining(&pg).await, 8);

    let err = pg
        .store
        .pay_order(order.id, pg.users[1].id, PaymentStamp::online(order.id, Utc::now().naive_utc()))
        .await
        .unwrap_err();
    assert!(err.is_order_denial());

    let paid = pg
        .store
        .pay_order(order.id, pg.users[0].id, PaymentStamp::online(order.id, Utc::now().naive_utc()))
        .await
        .unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);

    let err = pg.store.cancel_order(order.id, pg.users[0].id).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidState { status: OrderStatus::Paid, .. }));

    let second = pg.store.create_order(draft(&pg, 1, &[2])).await.unwrap();
    pg.store.cancel_order(second.id, pg.users[1].id).await.unwrap();
    assert_eq!(remaining(&pg).await, 8);

    // released seat is bookable again through the partial unique index
    pg.store.create_order(draft(&pg, 0, &[2])).await.unwrap();
    assert_eq!(remaining(&pg).await, 7);
}

#[tokio::test]
#[ignore = "needs Postgres at DATABASE_URL"]
async fn concurrent_claims_on_one_seat() {
    let pg = Arc::new(setup(8).await);

    let attempts = (0..8).map(|u| {
        let pg = pg.clone();
        tokio::spawn(async move { pg.store.create_order(draft(&pg, u, &[3, 4])).await })
    });
    let results: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, BookingError::SeatUnavailable(_))));
    assert_eq!(remaining(&pg).await, 8);
}

#[tokio::test]
#[ignore = "needs Postgres at DATABASE_URL"]
async fn purge_cascades_to_orders() {
    let pg = setup(1).await;
    let now = Utc::now().naive_utc();
    let old = pg
        .store
        .insert_screening(NewScreening {
            movie_id: pg.screening.movie_id,
            hall_id: pg.screening.hall_id,
            start_time: now - Duration::hours(9),
            end_time: now - Duration::hours(7),
            price: Decimal::new(5000, 2),
        })
        .await
        .unwrap();
    let order = pg
        .store
        .create_order(OrderDraft { user_id: pg.users[0].id, screening_id: old.id, seat_ids: vec![pg.seats[0].id] })
        .await
        .unwrap();

    let report = pg.store.purge_screenings_ended_before(now - Duration::hours(5)).await.unwrap();
    assert!(report.screenings_deleted >= 1);
    assert_eq!(report.failed, 0);
    assert!(pg.store.find_screening(old.id).await.unwrap().is_none());
    assert!(pg.store.find_order(order.id).await.unwrap().is_none());
    assert!(pg.store.find_screening(pg.screening.id).await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "needs Postgres at DATABASE_URL"]
async fn reviews_update_average_once_per_user() {
    let pg = setup(2).await;
    let movie_id = pg.screening.movie_id;
    let review = |user: usize, rating: i32| NewReview {
        user_id: pg.users[user].id,
        movie_id,
        rating,
        content: "ok".into(),
    };

    pg.store.add_review(review(0, 5)).await.unwrap();
    let (_, movie) = pg.store.add_review(review(1, 4)).await.unwrap();
    assert_eq!(movie.rating, Decimal::new(45, 1));

    let err = pg.store.add_review(review(0, 1)).await.unwrap_err();
    assert!(matches!(err, BookingError::AlreadyReviewed));
    assert_eq!(pg.store.movie_reviews(movie_id).await.unwrap().len(), 2);
}

#[tokio::test]
#[ignore = "needs Postgres at DATABASE_URL"]
async fn repeated_seat_is_rejected_before_any_write() {
    let pg = setup(1).await;

    let err = pg.store.create_order(draft(&pg, 0, &[2, 2])).await.unwrap_err();
    assert!(matches!(err, BookingError::Validation(ref m) if m.ends_with("selected twice")));
    assert_eq!(remaining(&pg).await, 10);
    assert!(pg.store.user_orders(pg.users[0].id).await.unwrap().is_empty());
}
