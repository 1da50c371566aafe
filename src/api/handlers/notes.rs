//! Note endpoints. Every note is scoped to the subject that created it.

use super::{json_body, parse_note_id, parse_user_id};
use crate::{
    api::error::{ApiError, ErrorBody},
    auth::{ensure_owner, AuthenticatedSubject},
    store::{Note, NoteDraft, NoteStore, UserStore},
};
use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

pub const TITLE_MAX_CHARS: usize = 200;
pub const CONTENT_MAX_CHARS: usize = 10_000;

/// Owner fields sent by clients are ignored.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NoteRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NoteCount {
    pub count: i64,
}

fn draft_from(request: NoteRequest) -> Result<NoteDraft, ApiError> {
    let title = request.title.trim().to_string();
    let title_chars = title.chars().count();
    if title_chars == 0 || title_chars > TITLE_MAX_CHARS {
        return Err(ApiError::Validation(format!(
            "title must be between 1 and {TITLE_MAX_CHARS} characters"
        )));
    }
    if request.content.chars().count() > CONTENT_MAX_CHARS {
        return Err(ApiError::Validation(format!(
            "content must be at most {CONTENT_MAX_CHARS} characters"
        )));
    }
    Ok(NoteDraft {
        title,
        content: request.content,
    })
}

/// Resolve a user id path segment the subject is allowed to read notes for.
async fn owned_user_id(
    users: &dyn UserStore,
    subject: &AuthenticatedSubject,
    raw: &str,
) -> Result<uuid::Uuid, ApiError> {
    let id = parse_user_id(raw)?;
    ensure_owner(users.find_by_id(id).await?, subject)?;
    Ok(id)
}

async fn owned_note(
    notes: &dyn NoteStore,
    subject: &AuthenticatedSubject,
    raw: &str,
) -> Result<Note, ApiError> {
    let id = parse_note_id(raw)?;
    Ok(ensure_owner(notes.find_by_id(id).await?, subject)?)
}

#[utoipa::path(
    get,
    path = "/notes/by-user/{id}",
    params(("id" = String, Path, description = "Owner id (UUID)")),
    responses(
        (status = 200, description = "Notes owned by the user", body = [Note]),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 403, description = "Not your notes", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "notes"
)]
pub async fn list_by_user(
    users: Extension<Arc<dyn UserStore>>,
    notes: Extension<Arc<dyn NoteStore>>,
    subject: AuthenticatedSubject,
    Path(id): Path<String>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let owner_id = owned_user_id(users.0.as_ref(), &subject, &id).await?;
    Ok(Json(notes.list_by_owner(owner_id).await?))
}

#[utoipa::path(
    get,
    path = "/notes/count-by-user/{id}",
    params(("id" = String, Path, description = "Owner id (UUID)")),
    responses(
        (status = 200, description = "Number of notes owned by the user", body = NoteCount),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 403, description = "Not your notes", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "notes"
)]
pub async fn count_by_user(
    users: Extension<Arc<dyn UserStore>>,
    notes: Extension<Arc<dyn NoteStore>>,
    subject: AuthenticatedSubject,
    Path(id): Path<String>,
) -> Result<Json<NoteCount>, ApiError> {
    let owner_id = owned_user_id(users.0.as_ref(), &subject, &id).await?;
    Ok(Json(NoteCount {
        count: notes.count_by_owner(owner_id).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/notes/{id}",
    params(("id" = i64, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note", body = Note),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 403, description = "Not your note", body = ErrorBody),
        (status = 404, description = "No such note", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "notes"
)]
pub async fn get_note(
    notes: Extension<Arc<dyn NoteStore>>,
    subject: AuthenticatedSubject,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    Ok(Json(owned_note(notes.0.as_ref(), &subject, &id).await?))
}

#[utoipa::path(
    post,
    path = "/notes",
    request_body = NoteRequest,
    responses(
        (status = 201, description = "Note created", body = Note),
        (status = 400, description = "Invalid title or content", body = ErrorBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "notes"
)]
pub async fn create_note(
    notes: Extension<Arc<dyn NoteStore>>,
    subject: AuthenticatedSubject,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let draft = draft_from(json_body(payload)?)?;
    let note = notes.create(subject.id, draft).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[utoipa::path(
    put,
    path = "/notes/{id}",
    params(("id" = i64, Path, description = "Note id")),
    request_body = NoteRequest,
    responses(
        (status = 200, description = "Updated note", body = Note),
        (status = 400, description = "Malformed id or invalid fields", body = ErrorBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 403, description = "Not your note", body = ErrorBody),
        (status = 404, description = "No such note", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "notes"
)]
pub async fn update_note(
    notes: Extension<Arc<dyn NoteStore>>,
    subject: AuthenticatedSubject,
    Path(id): Path<String>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let note = owned_note(notes.0.as_ref(), &subject, &id).await?;
    let draft = draft_from(json_body(payload)?)?;
    Ok(Json(notes.update(note.id, draft).await?))
}

#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(("id" = i64, Path, description = "Note id")),
    responses(
        (status = 204, description = "Note deleted"),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 403, description = "Not your note", body = ErrorBody),
        (status = 404, description = "No such note", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "notes"
)]
pub async fn delete_note(
    notes: Extension<Arc<dyn NoteStore>>,
    subject: AuthenticatedSubject,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let note = owned_note(notes.0.as_ref(), &subject, &id).await?;
    notes.delete(note.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
