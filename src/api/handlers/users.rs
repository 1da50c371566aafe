use super::{json_body, parse_user_id};
use crate::{
    api::error::{ApiError, ErrorBody},
    auth::{
        ensure_owner,
        validation::{normalize_login, validate_login, validate_password},
        AuthService, AuthenticatedSubject,
    },
    store::{StoreError, Subject, UserChanges, UserStore},
};
use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserUpdateRequest {
    pub login: Option<String>,
    pub password: Option<String>,
}

#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Authenticated subject", body = Subject),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 404, description = "Account no longer exists", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn me(
    users: Extension<Arc<dyn UserStore>>,
    subject: AuthenticatedSubject,
) -> Result<Json<Subject>, ApiError> {
    let record = users.find_by_id(subject.id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(record.subject))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    responses(
        (status = 200, description = "User", body = Subject),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user(
    users: Extension<Arc<dyn UserStore>>,
    _subject: AuthenticatedSubject,
    Path(id): Path<String>,
) -> Result<Json<Subject>, ApiError> {
    let id = parse_user_id(&id)?;
    let record = users.find_by_id(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(record.subject))
}

#[utoipa::path(
    get,
    path = "/users/by-login/{login}",
    params(("login" = String, Path, description = "User login")),
    responses(
        (status = 200, description = "User", body = Subject),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user_by_login(
    users: Extension<Arc<dyn UserStore>>,
    _subject: AuthenticatedSubject,
    Path(login): Path<String>,
) -> Result<Json<Subject>, ApiError> {
    let record = users
        .find_by_login(&normalize_login(&login))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(record.subject))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    request_body = UserUpdateRequest,
    responses(
        (status = 200, description = "Updated user", body = Subject),
        (status = 400, description = "Malformed id or invalid fields", body = ErrorBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 403, description = "Not your account", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody),
        (status = 409, description = "Login already exists", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    users: Extension<Arc<dyn UserStore>>,
    auth: Extension<Arc<AuthService>>,
    subject: AuthenticatedSubject,
    Path(id): Path<String>,
    payload: Result<Json<UserUpdateRequest>, JsonRejection>,
) -> Result<Json<Subject>, ApiError> {
    let id = parse_user_id(&id)?;
    ensure_owner(users.find_by_id(id).await?, &subject)?;

    let request = json_body(payload)?;
    let mut changes = UserChanges::default();
    if let Some(login) = request.login {
        let login = normalize_login(&login);
        validate_login(&login).map_err(ApiError::Validation)?;
        changes.login = Some(login);
    }
    if let Some(password) = request.password {
        validate_password(&password).map_err(ApiError::Validation)?;
        changes.password_hash = Some(auth.hash_password(&password).await?);
    }
    if changes.is_empty() {
        return Err(ApiError::Validation(
            "at least one of login or password is required".to_string(),
        ));
    }

    let updated = users.update(id, changes).await.map_err(|err| match err {
        StoreError::Conflict => ApiError::Conflict("login already exists".to_string()),
        other => other.into(),
    })?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    responses(
        (status = 204, description = "User and their notes deleted"),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
        (status = 403, description = "Not your account", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    users: Extension<Arc<dyn UserStore>>,
    subject: AuthenticatedSubject,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_user_id(&id)?;
    ensure_owner(users.find_by_id(id).await?, &subject)?;
    users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
