use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use std::sync::Arc;

use super::{redirect_with, FlashLevel};
use crate::error::BookingError;
use crate::middleware::AuthUser;
use crate::services::{catalog, reviews};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_movies))
        .route("/movies", get(list_movies))
        .route("/movie/{id}", get(get_movie))
        .route("/movie/{id}/review", post(add_review))
}

// GET / и GET /movies - весь каталог
async fn list_movies(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, BookingError> {
    let movies = state.store.list_movies().await?;
    Ok(Json(movies))
}

// GET /movie/{id}
async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    let detail = catalog::movie_detail(state.store.as_ref(), movie_id, Utc::now().naive_utc()).await?;
    Ok(Json(detail))
}

// POST /movie/{id}/review
async fn add_review(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(movie_id): Path<i64>,
    Form(form): Form<reviews::ReviewForm>,
) -> Response {
    let back = format!("/movie/{}", movie_id);
    match reviews::add_review(state.store.as_ref(), user.user_id, movie_id, form).await {
        Ok(_) => redirect_with(&back, FlashLevel::Success, "Review posted").into_response(),
        Err(BookingError::AlreadyReviewed) => {
            redirect_with(&back, FlashLevel::Warning, "You have already reviewed this movie")
                .into_response()
        }
        Err(e @ BookingError::Validation(_)) => {
            redirect_with(&back, FlashLevel::Danger, &e.public_message()).into_response()
        }
        Err(e) => e.into_response(),
    }
}
