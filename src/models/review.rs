use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: i32,
    pub content: String,
    pub likes: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: i32,
    pub content: String,
}

/// Mean of all ratings rounded half away from zero to one decimal place.
pub fn average_rating(ratings: &[i32]) -> Decimal {
    if ratings.is_empty() {
        return Decimal::ZERO;
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    (Decimal::from(sum) / Decimal::from(ratings.len() as u64))
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}
