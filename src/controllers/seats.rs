use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::error::BookingError;
use crate::middleware::AuthUser;
use crate::services::inventory;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/screening/{id}/seats", get(get_seat_map))
}

// GET /screening/{id}/seats
async fn get_seat_map(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(screening_id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    let map = inventory::seat_map(state.store.as_ref(), state.cache.as_ref(), screening_id).await?;
    Ok(Json(map))
}
