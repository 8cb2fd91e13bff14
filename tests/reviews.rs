//! Reviews and the movie page.

#![allow(clippy::unwrap_used)]

mod common;

use chrono::Duration;
use cinema_booking::error::BookingError;
use cinema_booking::services::catalog;
use cinema_booking::services::reviews::{self, ReviewForm};
use cinema_booking::store::BookingStore;
use common::{now, Fixture};
use rust_decimal::Decimal;

fn form(rating: i32, content: &str) -> ReviewForm {
    ReviewForm { rating, content: content.to_string() }
}

#[tokio::test]
async fn average_rating_follows_reviews() {
    let fx = Fixture::new().await;
    let store = fx.store.as_ref();

    let (_, movie) = reviews::add_review(store, fx.alice.id, fx.movie.id, form(5, "Loved it")).await.unwrap();
    assert_eq!(movie.rating, Decimal::from(5));

    let (_, movie) = reviews::add_review(store, fx.bob.id, fx.movie.id, form(2, "Meh")).await.unwrap();
    assert_eq!(movie.rating, Decimal::new(35, 1));
    assert_eq!(store.find_movie(fx.movie.id).await.unwrap().unwrap().rating, Decimal::new(35, 1));
}

#[tokio::test]
async fn one_review_per_user_and_movie() {
    let fx = Fixture::new().await;
    let store = fx.store.as_ref();
    reviews::add_review(store, fx.alice.id, fx.movie.id, form(4, "Good")).await.unwrap();

    let err = reviews::add_review(store, fx.alice.id, fx.movie.id, form(1, "Bad")).await.unwrap_err();
    assert!(matches!(err, BookingError::AlreadyReviewed));

    let stored = store.movie_reviews(fx.movie.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].rating, 4);
    assert_eq!(store.find_movie(fx.movie.id).await.unwrap().unwrap().rating, Decimal::from(4));
}

#[tokio::test]
async fn invalid_reviews_are_not_stored() {
    let fx = Fixture::new().await;
    let store = fx.store.as_ref();

    for bad in [form(0, "zero"), form(6, "six"), form(3, "   ")] {
        let err = reviews::add_review(store, fx.alice.id, fx.movie.id, bad).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }
    let err = reviews::add_review(store, fx.alice.id, 9999, form(3, "ghost")).await.unwrap_err();
    assert!(matches!(err, BookingError::NotFound { entity: "movie", .. }));

    assert!(store.movie_reviews(fx.movie.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn movie_detail_lists_only_upcoming_screenings_by_day() {
    let fx = Fixture::new().await;
    let store = fx.store.as_ref();
    fx.screening_ending_at(now() - Duration::hours(1)).await;
    let day_after = fx.screening_ending_at(now() + Duration::days(2)).await;

    let detail = catalog::movie_detail(store, fx.movie.id, now()).await.unwrap();
    let ids: Vec<Vec<i64>> = detail
        .screenings_by_date
        .iter()
        .map(|d| d.screenings.iter().map(|s| s.id).collect())
        .collect();
    assert_eq!(ids.concat(), vec![fx.screening.id, day_after.id]);
    assert!(detail.screenings_by_date.windows(2).all(|w| w[0].date < w[1].date));
}
