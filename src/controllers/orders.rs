use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use super::{redirect_with, FlashLevel};
use crate::error::BookingError;
use crate::middleware::AuthUser;
use crate::services::ledger;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create_order", post(create_order))
        .route("/order/{id}", get(get_order))
        .route("/order/{id}/pay", post(pay_order))
        .route("/order/{id}/cancel", post(cancel_order))
}

/* ---------- helpers ---------- */

const ORDER_NOT_FOUND: &str = "Order not found";
const ORDER_STATE_ERROR: &str = "Order status does not allow this operation";
const SEATS_TAKEN: &str = "Some of the selected seats are no longer available";

fn seats_page(screening_id: i64) -> String {
    format!("/screening/{}/seats", screening_id)
}

fn order_page(order_id: i64) -> String {
    format!("/order/{}", order_id)
}

/// Pay and cancel share one error mapping. Missing and foreign orders get
/// the same answer.
fn transition_error(order_id: i64, err: BookingError) -> Response {
    if err.is_order_denial() {
        return redirect_with("/", FlashLevel::Danger, ORDER_NOT_FOUND).into_response();
    }
    match err {
        BookingError::InvalidState { .. } => {
            redirect_with(&order_page(order_id), FlashLevel::Danger, ORDER_STATE_ERROR).into_response()
        }
        other => other.into_response(),
    }
}

/* ---------- ORDERS ---------- */

// POST /create_order
#[derive(Debug, Deserialize)]
struct CreateOrderForm {
    screening_id: Option<String>,
    seat_ids: Option<String>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    headers: HeaderMap,
    Form(form): Form<CreateOrderForm>,
) -> Response {
    let referer = headers.get(header::REFERER).and_then(|v| v.to_str().ok());
    let Some(screening_id) = ledger::resolve_screening_id(form.screening_id.as_deref(), referer) else {
        return redirect_with("/", FlashLevel::Danger, "Invalid screening").into_response();
    };

    let seat_ids = match ledger::parse_seat_ids(form.seat_ids.as_deref().unwrap_or_default()) {
        Ok(ids) => ids,
        Err(e) => {
            return redirect_with(&seats_page(screening_id), FlashLevel::Danger, &e.public_message())
                .into_response()
        }
    };

    match ledger::create_order(state.store.as_ref(), user.user_id, screening_id, seat_ids).await {
        Ok(order) => {
            redirect_with(&order_page(order.id), FlashLevel::Success, "Order created, please pay")
                .into_response()
        }
        Err(BookingError::SeatUnavailable(_)) => {
            redirect_with(&seats_page(screening_id), FlashLevel::Danger, SEATS_TAKEN).into_response()
        }
        Err(e @ BookingError::Validation(_)) => {
            redirect_with(&seats_page(screening_id), FlashLevel::Danger, &e.public_message())
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

// GET /order/{id}
async fn get_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(order_id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    let detail = ledger::order_detail(state.store.as_ref(), order_id, user.user_id).await?;
    Ok(Json(detail))
}

// POST /order/{id}/pay
async fn pay_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(order_id): Path<i64>,
) -> Response {
    let now = Utc::now().naive_utc();
    match ledger::pay_order(state.store.as_ref(), order_id, user.user_id, now).await {
        Ok(order) => {
            redirect_with(&order_page(order.id), FlashLevel::Success, "Payment successful").into_response()
        }
        Err(e) => transition_error(order_id, e),
    }
}

// POST /order/{id}/cancel
async fn cancel_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(order_id): Path<i64>,
) -> Response {
    match ledger::cancel_order(state.store.as_ref(), order_id, user.user_id).await {
        Ok(_) => redirect_with("/user/profile", FlashLevel::Success, "Order cancelled").into_response(),
        Err(e) => transition_error(order_id, e),
    }
}
