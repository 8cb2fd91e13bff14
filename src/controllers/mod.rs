pub mod movies;
pub mod orders;
pub mod seats;
pub mod users;

use axum::{response::Redirect, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(seats::routes())
        .merge(orders::routes())
        .merge(users::routes())
        .merge(movies::routes())
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
    Danger,
}

#[derive(Serialize)]
struct Flash<'a> {
    level: FlashLevel,
    message: &'a str,
}

/// 303 redirect carrying a one-shot message for the next page.
pub fn redirect_with(path: &str, level: FlashLevel, message: &str) -> Redirect {
    match serde_urlencoded::to_string(Flash { level, message }) {
        Ok(query) => Redirect::to(&format!("{}?{}", path, query)),
        Err(_) => Redirect::to(path),
    }
}
