use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

/// Authenticated requester. Only the id matters to the booking core.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
}

/// Splits a `Basic` authorization header into login and password.
pub fn parse_basic_credentials(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    // Разделяем login:password
    let (login, password) = credentials.split_once(':')?;
    if login.is_empty() {
        return None;
    }
    Some((login.to_string(), password.to_string()))
}

// Basic Auth extractor: логин по username или email
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let (login, password) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_basic_credentials)
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let user = state
            .store
            .find_user_by_login(&login)
            .await
            .map_err(|e| {
                tracing::error!("user lookup failed: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        // bcrypt намеренно медленный, не держим на нём async-поток
        let verified = tokio::task::spawn_blocking(move || {
            let ok = user.verify_password(&password);
            (ok, user)
        })
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        match verified {
            (true, user) => Ok(AuthUser { user_id: user.id, username: user.username }),
            (false, _) => Err(StatusCode::UNAUTHORIZED),
        }
    }
}
