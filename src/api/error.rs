use crate::auth::{
    guard::{GuardError, OwnershipError},
    service::AuthError,
};
use crate::store::StoreError;
use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Every failure a handler can return, mapped onto one HTTP status each.
#[derive(Debug, PartialEq, Eq)]
pub enum ApiError {
    Validation(String),
    NotAuthenticated,
    Forbidden,
    NotFound,
    Conflict(String),
    Internal,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Conflict(msg) => msg.clone(),
            Self::NotAuthenticated => "not authenticated".to_string(),
            Self::Forbidden => "forbidden".to_string(),
            Self::NotFound => "not found".to_string(),
            Self::Internal => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (
            status,
            Json(ErrorBody {
                error: self.message(),
            }),
        )
            .into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => Self::Validation(msg),
            AuthError::LoginAlreadyExists => Self::Conflict("login already exists".to_string()),
            AuthError::NotAuthenticated => Self::NotAuthenticated,
            AuthError::Store(err) => err.into(),
            AuthError::Hashing(err) => {
                error!("Password hashing failed: {err}");
                Self::Internal
            }
            AuthError::Token(err) => {
                error!("Token issuance failed: {err}");
                Self::Internal
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            StoreError::Conflict => Self::Conflict("resource already exists".to_string()),
            StoreError::Backend(err) => {
                error!("Storage failure: {err:#}");
                Self::Internal
            }
        }
    }
}

impl From<GuardError> for ApiError {
    fn from(_: GuardError) -> Self {
        Self::NotAuthenticated
    }
}

impl From<OwnershipError> for ApiError {
    fn from(err: OwnershipError) -> Self {
        match err {
            OwnershipError::NotFound => Self::NotFound,
            OwnershipError::Forbidden => Self::Forbidden,
        }
    }
}
