//! Public authentication endpoints.
//!
//! These bypass the access-token guard and drive [`AuthService`] directly.
//! Refresh tokens travel in the request body, never in a header.

use super::json_body;
use crate::{
    api::error::{ApiError, ErrorBody},
    auth::{service::TokenPair, AuthService},
    store::Subject,
};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignUpResponse {
    pub user: Subject,
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-up",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Account created", body = SignUpResponse),
        (status = 400, description = "Invalid login or password", body = ErrorBody),
        (status = 409, description = "Login already exists", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn sign_up(
    auth: Extension<Arc<AuthService>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<SignUpResponse>, ApiError> {
    let request = json_body(payload)?;
    let outcome = auth.sign_up(&request.login, &request.password).await?;
    Ok(Json(SignUpResponse {
        user: outcome.subject,
        tokens: outcome.tokens.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-in",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Signed in", body = TokenResponse),
        (status = 400, description = "Malformed request", body = ErrorBody),
        (status = 401, description = "Unknown login or wrong password", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn sign_in(
    auth: Extension<Arc<AuthService>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let request = json_body(payload)?;
    let pair = auth.sign_in(&request.login, &request.password).await?;
    Ok(Json(pair.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 400, description = "Malformed request", body = ErrorBody),
        (status = 401, description = "Invalid, expired or non-refresh token", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn refresh(
    auth: Extension<Arc<AuthService>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let request = json_body(payload)?;
    let pair = auth.refresh(&request.refresh_token)?;
    Ok(Json(pair.into()))
}
