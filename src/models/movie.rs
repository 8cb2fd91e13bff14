use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub genre: Option<String>,
    pub duration_minutes: i32,
    pub release_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub poster: Option<String>,
    /// Average review rating, one decimal place. Recomputed on every review.
    pub rating: Decimal,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct NewMovie {
    pub title: String,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub genre: Option<String>,
    pub duration_minutes: i32,
    pub release_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub poster: Option<String>,
}
