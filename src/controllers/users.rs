use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::error::BookingError;
use crate::middleware::AuthUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/user/profile", get(profile))
}

// GET /user/profile - заказы пользователя, новые сверху
async fn profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, BookingError> {
    let orders = state.store.user_orders(user.user_id).await?;
    Ok(Json(json!({
        "user": { "id": user.user_id, "username": user.username },
        "orders": orders,
    })))
}
