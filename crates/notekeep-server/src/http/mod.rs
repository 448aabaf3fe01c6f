//! HTTP surface: the axum router, request validation and the response
//! envelope.

mod auth;
mod extract;
mod notes;
mod response;
mod validate;

use std::any::Any;

use axum::Router;
use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::service::{NoteService, TokenService, UserService};

pub use extract::{AuthRejection, AuthUser};
pub use response::ApiResponse;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub tokens: TokenService,
    pub users: UserService,
    pub notes: NoteService,
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

/// Build the application router with request tracing and panic recovery.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/notes", post(notes::create).get(notes::list))
        .route(
            "/notes/{id}",
            get(notes::get_one).put(notes::update).delete(notes::delete),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

/// `GET /ping`
async fn ping() -> ApiResponse {
    ApiResponse::message("pong")
}

async fn not_found() -> ApiResponse {
    ApiResponse::error(StatusCode::NOT_FOUND, "not found")
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!(panic = %detail, "Handler panicked");

    ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}
