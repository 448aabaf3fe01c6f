//! Bearer-token extractor for the note routes.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::auth::TokenKind;
use crate::service::{ServiceError, TokenService};

use super::response::{ApiResponse, public_message};

/// The caller behind a verified `Authorization: Bearer <access token>`.
///
/// The token goes through full verification, including the lookup of its
/// stored record, so rotated or blacklisted tokens are refused.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Rejection for [`AuthUser`]. Always answers 401.
#[derive(Debug)]
pub enum AuthRejection {
    MissingToken,
    Invalid(ServiceError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            Self::MissingToken => "authorization header is required".to_string(),
            Self::Invalid(err) => public_message(&err),
        };
        ApiResponse::error(StatusCode::UNAUTHORIZED, message).into_response()
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthRejection::MissingToken)?;

        let record = TokenService::from_ref(state)
            .verify(token, TokenKind::Access)
            .await
            .map_err(AuthRejection::Invalid)?;

        Ok(Self {
            user_id: record.user_id,
        })
    }
}
