//! Persistence seams for users and notes.
//!
//! Handlers and the auth service only see the [`UserStore`] and [`NoteStore`]
//! traits. "Not found" is always `Ok(None)` (or [`StoreError::NotFound`] for
//! mutations), distinct from [`StoreError::Backend`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::{PgNoteStore, PgUserStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("unique constraint violated")]
    Conflict,
    #[error("storage backend failure")]
    Backend(#[source] anyhow::Error),
}

impl StoreError {
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        Self::Backend(err.into())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            other if postgres::is_unique_violation(&other) => Self::Conflict,
            other => Self::backend(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Public identity of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Subject {
    pub id: Uuid,
    pub login: String,
}

/// Stored account, including the password digest. Never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub subject: Subject,
    pub password_hash: String,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Partial user update; `None` leaves the field unchanged.
#[derive(Default, Clone)]
pub struct UserChanges {
    pub login: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.login.is_none() && self.password_hash.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Note {
    pub id: i64,
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds.
    pub updated_at: i64,
}

/// Title and content of a note to create or replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;

    async fn find_by_login(&self, login: &str) -> StoreResult<Option<UserRecord>>;

    /// # Errors
    /// [`StoreError::Conflict`] if the login is taken.
    async fn create(&self, login: &str, password_hash: &str) -> StoreResult<Subject>;

    /// # Errors
    /// [`StoreError::NotFound`] for an unknown id, [`StoreError::Conflict`]
    /// if the new login is taken.
    async fn update(&self, id: Uuid, changes: UserChanges) -> StoreResult<Subject>;

    /// Removes the user and every note they own.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Note>>;

    async fn list_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Note>>;

    async fn create(&self, owner_id: Uuid, draft: NoteDraft) -> StoreResult<Note>;

    async fn update(&self, id: i64, draft: NoteDraft) -> StoreResult<Note>;

    async fn delete(&self, id: i64) -> StoreResult<()>;

    async fn count_by_owner(&self, owner_id: Uuid) -> StoreResult<i64>;
}
