//! Postgres-backed stores over a shared `sqlx::PgPool`.
//!
//! Expects the tables in `sql/schema.sql`. Timestamps are returned as unix
//! seconds.

use super::{
    Note, NoteDraft, NoteStore, StoreError, StoreResult, Subject, UserChanges, UserRecord,
    UserStore,
};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

const NOTE_COLUMNS: &str = "id, user_id, title, content, \
     EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at, \
     EXTRACT(EPOCH FROM updated_at)::BIGINT AS updated_at";

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

macro_rules! db_span {
    ($operation:expr, $statement:expr) => {
        info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = $operation,
            db.statement = $statement
        )
    };
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        subject: Subject {
            id: row.try_get("id")?,
            login: row.try_get("login")?,
        },
        password_hash: row.try_get("password_hash")?,
    })
}

fn note_from_row(row: &PgRow) -> Result<Note, sqlx::Error> {
    Ok(Note {
        id: row.try_get("id")?,
        owner_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let query = "SELECT id, login, password_hash FROM users WHERE id = $1";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span!("SELECT", query))
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_login(&self, login: &str) -> StoreResult<Option<UserRecord>> {
        let query = "SELECT id, login, password_hash FROM users WHERE login = $1";
        let row = sqlx::query(query)
            .bind(login)
            .fetch_optional(&self.pool)
            .instrument(db_span!("SELECT", query))
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn create(&self, login: &str, password_hash: &str) -> StoreResult<Subject> {
        let query =
            "INSERT INTO users (id, login, password_hash) VALUES ($1, $2, $3) RETURNING id, login";
        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(login)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(db_span!("INSERT", query))
            .await?;
        Ok(Subject {
            id: row.try_get("id")?,
            login: row.try_get("login")?,
        })
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> StoreResult<Subject> {
        let query = r"
            UPDATE users
            SET login = COALESCE($2, login),
                password_hash = COALESCE($3, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, login
        ";
        let row = sqlx::query(query)
            .bind(id)
            .bind(changes.login)
            .bind(changes.password_hash)
            .fetch_optional(&self.pool)
            .instrument(db_span!("UPDATE", query))
            .await?
            .ok_or(StoreError::NotFound)?;
        Ok(Subject {
            id: row.try_get("id")?,
            login: row.try_get("login")?,
        })
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        // notes.user_id cascades
        let query = "DELETE FROM users WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span!("DELETE", query))
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .instrument(info_span!(
                "db.ping",
                db.system = "postgresql",
                db.operation = "PING"
            ))
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgNoteStore {
    pool: PgPool,
}

impl PgNoteStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Note>> {
        let query = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span!("SELECT", query.as_str()))
            .await?;
        Ok(row.as_ref().map(note_from_row).transpose()?)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Note>> {
        let query = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = $1 ORDER BY id");
        let rows = sqlx::query(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .instrument(db_span!("SELECT", query.as_str()))
            .await?;
        Ok(rows
            .iter()
            .map(note_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn create(&self, owner_id: Uuid, draft: NoteDraft) -> StoreResult<Note> {
        let query = format!(
            "INSERT INTO notes (user_id, title, content) VALUES ($1, $2, $3) RETURNING {NOTE_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(owner_id)
            .bind(draft.title)
            .bind(draft.content)
            .fetch_one(&self.pool)
            .instrument(db_span!("INSERT", query.as_str()))
            .await
            .map_err(|err| match err {
                // owner vanished between the guard and the insert
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    StoreError::NotFound
                }
                other => StoreError::from(other),
            })?;
        Ok(note_from_row(&row)?)
    }

    async fn update(&self, id: i64, draft: NoteDraft) -> StoreResult<Note> {
        let query = format!(
            "UPDATE notes SET title = $2, content = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {NOTE_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(draft.title)
            .bind(draft.content)
            .fetch_optional(&self.pool)
            .instrument(db_span!("UPDATE", query.as_str()))
            .await?
            .ok_or(StoreError::NotFound)?;
        Ok(note_from_row(&row)?)
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let query = "DELETE FROM notes WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span!("DELETE", query))
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn count_by_owner(&self, owner_id: Uuid) -> StoreResult<i64> {
        let query = "SELECT COUNT(*) FROM notes WHERE user_id = $1";
        let count: i64 = sqlx::query_scalar(query)
            .bind(owner_id)
            .fetch_one(&self.pool)
            .instrument(db_span!("SELECT", query))
            .await?;
        Ok(count)
    }
}
