//! `/auth` handlers: register, login and refresh.

use axum::extract::State;
use serde_json::{Value, json};

use crate::service::{IssuedToken, ServiceError, TokenPair};
use crate::storage::User;

use super::AppState;
use super::response::ApiResponse;
use super::validate::{LoginRequest, RefreshRequest, RegisterRequest, Valid};

const EXPIRES_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `POST /auth/register`
pub async fn register(
    State(state): State<AppState>,
    Valid(req): Valid<RegisterRequest>,
) -> Result<ApiResponse, ServiceError> {
    let user = state
        .users
        .register(&req.name, &req.email, &req.password)
        .await?;
    let pair = state.tokens.issue_pair(&user).await?;

    Ok(ApiResponse::created(auth_payload(&user, &pair)))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    Valid(req): Valid<LoginRequest>,
) -> Result<ApiResponse, ServiceError> {
    let user = state.users.authenticate(&req.email, &req.password).await?;
    let pair = state.tokens.issue_pair(&user).await?;

    Ok(ApiResponse::ok(auth_payload(&user, &pair)))
}

/// `POST /auth/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    Valid(req): Valid<RefreshRequest>,
) -> Result<ApiResponse, ServiceError> {
    let (pair, user) = state.tokens.rotate(&req.token).await?;

    Ok(ApiResponse::ok(auth_payload(&user, &pair)))
}

fn auth_payload(user: &User, pair: &TokenPair) -> Value {
    json!({
        "user": user,
        "token": {
            "access": token_json(&pair.access),
            "refresh": token_json(&pair.refresh),
        },
    })
}

fn token_json(issued: &IssuedToken) -> Value {
    json!({
        "token": issued.token,
        "expires": format_expiry(issued.expires_at()),
    })
}

/// Render a unix timestamp as `YYYY-MM-DD HH:MM:SS` in UTC.
fn format_expiry(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format(EXPIRES_FORMAT).to_string())
        .unwrap_or_default()
}
