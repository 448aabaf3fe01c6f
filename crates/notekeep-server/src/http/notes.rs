//! `/notes` handlers. All of them require a bearer access token.

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::json;

use crate::service::ServiceError;

use super::AppState;
use super::extract::AuthUser;
use super::response::ApiResponse;
use super::validate::{NoteRequest, Valid, check_note_id, parse_page};

/// Notes per page on `GET /notes`.
const PAGE_SIZE: u32 = 5;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    page: Option<String>,
}

/// `POST /notes`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Valid(req): Valid<NoteRequest>,
) -> Result<ApiResponse, ServiceError> {
    let note = state
        .notes
        .create(&auth.user_id, &req.title, &req.content)
        .await?;

    Ok(ApiResponse::created(json!({ "note": note })))
}

/// `GET /notes?page=N`
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<ApiResponse, ServiceError> {
    let page = parse_page(params.page.as_deref())?;
    let result = state.notes.list(&auth.user_id, page, PAGE_SIZE).await?;

    Ok(ApiResponse::ok(json!({
        "notes": result.notes,
        "prev": result.has_prev,
        "next": result.has_next,
    })))
}

/// `GET /notes/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse, ServiceError> {
    check_note_id(&id)?;
    let lookup = state.notes.get_by_id(&auth.user_id, &id).await?;

    let data = if lookup.is_cached() {
        json!({ "note": lookup.note, "cache": true })
    } else {
        json!({ "note": lookup.note })
    };
    Ok(ApiResponse::ok(data))
}

/// `PUT /notes/{id}`
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Valid(req): Valid<NoteRequest>,
) -> Result<ApiResponse, ServiceError> {
    check_note_id(&id)?;
    state
        .notes
        .update(&auth.user_id, &id, &req.title, &req.content)
        .await?;

    Ok(ApiResponse::empty())
}

/// `DELETE /notes/{id}`
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse, ServiceError> {
    check_note_id(&id)?;
    state.notes.delete(&auth.user_id, &id).await?;

    Ok(ApiResponse::empty())
}
