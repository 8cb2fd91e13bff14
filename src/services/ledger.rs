//! Order ledger: booking, payment stub and cancellation.
//!
//! Input parsing lives here; the atomic part of each operation is delegated
//! to the [`BookingStore`], which owns the transaction.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{BookingError, BookingResult};
use crate::models::{
    ensure_distinct_seats, Cinema, Hall, Movie, Order, OrderDraft, PaymentStamp, Screening, Seat,
};
use crate::store::BookingStore;

pub const EMPTY_SELECTION: &str = "Please select at least one seat";
pub const INVALID_SELECTION: &str = "Invalid seat selection, please choose again";

/// Parses the comma separated seat list posted by the seat picker.
///
/// Blank tokens (a trailing comma) are skipped. Anything else that is not a
/// positive integer, or an id given twice, rejects the whole request.
pub fn parse_seat_ids(raw: &str) -> BookingResult<Vec<i64>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.contains("NaN") {
        return Err(BookingError::validation(EMPTY_SELECTION));
    }

    let mut ids = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let id: i64 = token
            .parse()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| BookingError::validation(INVALID_SELECTION))?;
        ids.push(id);
    }

    if ids.is_empty() {
        return Err(BookingError::validation(EMPTY_SELECTION));
    }
    ensure_distinct_seats(&ids)?;
    Ok(ids)
}

/// Screening id from the booking form, falling back to the
/// `/screening/{id}` segment of the referring page.
pub fn resolve_screening_id(form_value: Option<&str>, referer: Option<&str>) -> Option<i64> {
    let from_form = form_value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "NaN")
        .and_then(|v| v.parse::<i64>().ok());

    from_form.or_else(|| referer.and_then(screening_id_from_path)).filter(|id| *id > 0)
}

fn screening_id_from_path(url: &str) -> Option<i64> {
    let (_, rest) = url.split_once("/screening/")?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

pub async fn create_order(
    store: &dyn BookingStore,
    user_id: i64,
    screening_id: i64,
    seat_ids: Vec<i64>,
) -> BookingResult<Order> {
    if seat_ids.is_empty() {
        return Err(BookingError::validation(EMPTY_SELECTION));
    }
    let seat_count = seat_ids.len();
    let draft = OrderDraft { user_id, screening_id, seat_ids };
    if let Err(e) = draft.ensure_distinct_seats() {
        warn!("booking rejected for user {} on screening {}: {}", user_id, screening_id, e);
        return Err(e);
    }

    match store.create_order(draft).await {
        Ok(order) => {
            info!(
                "🎫 order {} created: user={} screening={} seats={} total={}",
                order.id, user_id, screening_id, seat_count, order.total_price
            );
            Ok(order)
        }
        Err(e @ BookingError::SeatUnavailable(_)) | Err(e @ BookingError::Validation(_)) => {
            warn!("booking rejected for user {} on screening {}: {}", user_id, screening_id, e);
            Err(e)
        }
        Err(e) => Err(e),
    }
}

pub async fn pay_order(
    store: &dyn BookingStore,
    order_id: i64,
    user_id: i64,
    now: NaiveDateTime,
) -> BookingResult<Order> {
    let order = store.pay_order(order_id, user_id, PaymentStamp::online(order_id, now)).await?;
    info!(
        "💳 order {} paid, transaction {}",
        order.id,
        order.transaction_id.as_deref().unwrap_or_default()
    );
    Ok(order)
}

pub async fn cancel_order(
    store: &dyn BookingStore,
    order_id: i64,
    user_id: i64,
) -> BookingResult<Order> {
    let order = store.cancel_order(order_id, user_id).await?;
    info!("order {} cancelled, seats released", order.id);
    Ok(order)
}

/// Order together with everything the confirmation page shows.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub seats: Vec<Seat>,
    pub screening: Screening,
    pub movie: Movie,
    pub hall: Hall,
    pub cinema: Option<Cinema>,
}

/// Loads an order for its owner. A foreign order is reported exactly like a
/// missing one.
pub async fn order_detail(
    store: &dyn BookingStore,
    order_id: i64,
    user_id: i64,
) -> BookingResult<OrderDetail> {
    let order = store
        .find_order(order_id)
        .await?
        .filter(|o| o.user_id == user_id)
        .ok_or_else(|| BookingError::not_found("order", order_id))?;

    let screening = store
        .find_screening(order.screening_id)
        .await?
        .ok_or_else(|| BookingError::not_found("screening", order.screening_id))?;
    let movie = store
        .find_movie(screening.movie_id)
        .await?
        .ok_or_else(|| BookingError::not_found("movie", screening.movie_id))?;
    let hall = store
        .find_hall(screening.hall_id)
        .await?
        .ok_or_else(|| BookingError::not_found("hall", screening.hall_id))?;
    let cinema = store.find_cinema(hall.cinema_id).await?;
    let seats = store.order_seats(order.id).await?;

    Ok(OrderDetail { order, seats, screening, movie, hall, cinema })
}
