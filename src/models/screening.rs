use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Advisory only; nothing in the booking path checks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "screening_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScreeningStatus {
    Upcoming,
    Ongoing,
    Ended,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Screening {
    pub id: i64,
    pub movie_id: i64,
    pub hall_id: i64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub price: Decimal,
    /// Денормализованный счётчик: total_seats - места активных заказов.
    pub remaining_seats: i32,
    pub status: ScreeningStatus,
}

#[derive(Debug, Clone)]
pub struct NewScreening {
    pub movie_id: i64,
    pub hall_id: i64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub price: Decimal,
}
