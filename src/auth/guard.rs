//! Request guard for protected routes and the ownership check handlers run
//! against the bound subject.

use super::token::{TokenClass, TokenCodec};
use crate::api::error::ApiError;
use crate::store::{Note, UserRecord};
use axum::{
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("missing bearer credentials")]
    MissingCredentials,
    #[error("not authenticated")]
    NotAuthenticated,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("resource not found")]
    NotFound,
    #[error("resource belongs to another subject")]
    Forbidden,
}

/// Subject bound to the request by [`require_access_token`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSubject {
    pub id: Uuid,
    pub login: String,
}

impl<S> FromRequestParts<S> for AuthenticatedSubject
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(ApiError::NotAuthenticated)
    }
}

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Validate the bearer token as an access token and bind its subject.
///
/// # Errors
/// [`GuardError::MissingCredentials`] without a bearer header and
/// [`GuardError::NotAuthenticated`] for any token failure; both answer 401.
pub fn authenticate(codec: &TokenCodec, headers: &HeaderMap) -> Result<AuthenticatedSubject, GuardError> {
    let token = extract_bearer_token(headers).ok_or(GuardError::MissingCredentials)?;
    let claims = codec
        .validate_as(token, TokenClass::Access)
        .map_err(|err| {
            debug!(reason = %err, "access token rejected");
            GuardError::NotAuthenticated
        })?;
    Ok(AuthenticatedSubject {
        id: claims.sub,
        login: claims.username,
    })
}

/// Middleware for protected routes.
///
/// # Errors
/// Rejects the request with 401 before it reaches the handler.
pub async fn require_access_token(
    Extension(codec): Extension<Arc<TokenCodec>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let subject = authenticate(&codec, request.headers())?;
    tracing::Span::current().record("subject", tracing::field::display(subject.id));
    request.extensions_mut().insert(subject);
    Ok(next.run(request).await)
}

/// Anything with a single owning subject.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for Note {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// A user account is owned by itself.
impl Owned for UserRecord {
    fn owner_id(&self) -> Uuid {
        self.subject.id
    }
}

/// Existence first, then ownership.
///
/// # Errors
/// [`OwnershipError::NotFound`] when `resource` is `None`,
/// [`OwnershipError::Forbidden`] when someone else owns it.
pub fn ensure_owner<R: Owned>(
    resource: Option<R>,
    subject: &AuthenticatedSubject,
) -> Result<R, OwnershipError> {
    let resource = resource.ok_or(OwnershipError::NotFound)?;
    if resource.owner_id() != subject.id {
        debug!(subject = %subject.id, owner = %resource.owner_id(), "ownership check failed");
        return Err(OwnershipError::Forbidden);
    }
    Ok(resource)
}
