//! Note API handlers

use crate::auth::AuthenticatedUser;
use crate::error::{ApiJson, ApiPath, AppError};
use crate::handlers::auth::MessageResponse;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use notes_core::{Note, NoteInput};
use std::sync::Arc;

/// List the caller's notes
#[utoipa::path(
    get,
    path = "/notes",
    tag = "notes",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Notes owned by the caller", body = [Note]),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
    )
)]
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Note>>, AppError> {
    Ok(Json(state.notes.list(&user).await?))
}

/// Create a note
#[utoipa::path(
    post,
    path = "/notes",
    tag = "notes",
    security(("bearer_auth" = [])),
    request_body = NoteInput,
    responses(
        (status = 201, description = "Note created", body = Note),
        (status = 400, description = "Empty note or malformed body", body = crate::error::ApiError),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
    )
)]
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiJson(input): ApiJson<NoteInput>,
) -> Result<(StatusCode, Json<Note>), AppError> {
    let note = state.notes.create(&user, &input).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// Get one of the caller's notes
#[utoipa::path(
    get,
    path = "/notes/{id}",
    tag = "notes",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Note ID")),
    responses(
        (status = 200, description = "The note", body = Note),
        (status = 400, description = "Invalid note ID", body = crate::error::ApiError),
        (status = 403, description = "Owned by another user", body = crate::error::ApiError),
        (status = 404, description = "Note not found", body = crate::error::ApiError),
    )
)]
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Note>, AppError> {
    Ok(Json(state.notes.get(&user, id).await?))
}

/// Replace a note's title and content
#[utoipa::path(
    put,
    path = "/notes/{id}",
    tag = "notes",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Note ID")),
    request_body = NoteInput,
    responses(
        (status = 200, description = "Updated note", body = Note),
        (status = 400, description = "Invalid note ID or body", body = crate::error::ApiError),
        (status = 403, description = "Owned by another user", body = crate::error::ApiError),
        (status = 404, description = "Note not found", body = crate::error::ApiError),
    )
)]
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<NoteInput>,
) -> Result<Json<Note>, AppError> {
    Ok(Json(state.notes.update(&user, id, &input).await?))
}

/// Delete a note
#[utoipa::path(
    delete,
    path = "/notes/{id}",
    tag = "notes",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Note deleted", body = MessageResponse),
        (status = 400, description = "Invalid note ID", body = crate::error::ApiError),
        (status = 403, description = "Owned by another user", body = crate::error::ApiError),
        (status = 404, description = "Note not found", body = crate::error::ApiError),
    )
)]
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.notes.delete(&user, id).await?;
    Ok(Json(MessageResponse::new("Note deleted")))
}
