use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::OrderStatus;

pub type BookingResult<T> = Result<T, BookingError>;

/// Ошибки ядра бронирования.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("access denied")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("seats already taken: {0:?}")]
    SeatUnavailable(Vec<i64>),

    #[error("order {order_id} is {status}, expected pending")]
    InvalidState { order_id: i64, status: OrderStatus },

    #[error("movie already reviewed by this user")]
    AlreadyReviewed,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl BookingError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        BookingError::NotFound { entity, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        BookingError::Validation(message.into())
    }

    /// Order lookups must not reveal whether someone else's order exists.
    pub fn is_order_denial(&self) -> bool {
        matches!(
            self,
            BookingError::Forbidden | BookingError::NotFound { entity: "order", .. }
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BookingError::Forbidden => StatusCode::FORBIDDEN,
            BookingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::SeatUnavailable(_)
            | BookingError::InvalidState { .. }
            | BookingError::AlreadyReviewed => StatusCode::CONFLICT,
            BookingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            BookingError::NotFound { .. } => "NOT_FOUND",
            BookingError::Forbidden => "FORBIDDEN",
            BookingError::Validation(_) => "VALIDATION_ERROR",
            BookingError::SeatUnavailable(_) => "SEAT_UNAVAILABLE",
            BookingError::InvalidState { .. } => "STATE_CONFLICT",
            BookingError::AlreadyReviewed => "ALREADY_REVIEWED",
            BookingError::Database(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Text safe to show to the end user.
    pub fn public_message(&self) -> String {
        match self {
            BookingError::Database(_) => "Internal error, please try again later".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        if let BookingError::Database(ref e) = self {
            tracing::error!("store error: {:?}", e);
        }

        let body = Json(json!({
            "error": self.public_message(),
            "code": self.code(),
        }));

        (self.status_code(), body).into_response()
    }
}

/// Postgres unique_violation, raised when two active orders claim one seat.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505")
}
