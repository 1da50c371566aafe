//! In-process store implementing both [`UserStore`] and [`NoteStore`].

use super::{
    Note, NoteDraft, NoteStore, StoreError, StoreResult, Subject, UserChanges, UserRecord,
    UserStore,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRecord>,
    notes: BTreeMap<i64, Note>,
    next_note_id: i64,
}

impl Tables {
    fn login_taken(&self, login: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.subject.login == login && Some(u.subject.id) != except)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .unwrap_or_default()
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_by_login(&self, login: &str) -> StoreResult<Option<UserRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.subject.login == login)
            .cloned())
    }

    async fn create(&self, login: &str, password_hash: &str) -> StoreResult<Subject> {
        let mut tables = self.tables.lock().await;
        if tables.login_taken(login, None) {
            return Err(StoreError::Conflict);
        }
        let subject = Subject {
            id: Uuid::new_v4(),
            login: login.to_string(),
        };
        tables.users.insert(
            subject.id,
            UserRecord {
                subject: subject.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(subject)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> StoreResult<Subject> {
        let mut tables = self.tables.lock().await;
        if let Some(login) = changes.login.as_deref() {
            if tables.login_taken(login, Some(id)) {
                return Err(StoreError::Conflict);
            }
        }
        let record = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(login) = changes.login {
            record.subject.login = login;
        }
        if let Some(hash) = changes.password_hash {
            record.password_hash = hash;
        }
        Ok(record.subject.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.users.remove(&id).ok_or(StoreError::NotFound)?;
        tables.notes.retain(|_, note| note.owner_id != id);
        Ok(())
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Note>> {
        Ok(self.tables.lock().await.notes.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Note>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .notes
            .values()
            .filter(|n| n.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn create(&self, owner_id: Uuid, draft: NoteDraft) -> StoreResult<Note> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&owner_id) {
            return Err(StoreError::NotFound);
        }
        tables.next_note_id += 1;
        let now = unix_now();
        let note = Note {
            id: tables.next_note_id,
            owner_id,
            title: draft.title,
            content: draft.content,
            created_at: now,
            updated_at: now,
        };
        tables.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn update(&self, id: i64, draft: NoteDraft) -> StoreResult<Note> {
        let mut tables = self.tables.lock().await;
        let note = tables.notes.get_mut(&id).ok_or(StoreError::NotFound)?;
        note.title = draft.title;
        note.content = draft.content;
        note.updated_at = unix_now();
        Ok(note.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        self.tables
            .lock()
            .await
            .notes
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn count_by_owner(&self, owner_id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        let count = tables
            .notes
            .values()
            .filter(|n| n.owner_id == owner_id)
            .count();
        i64::try_from(count).map_err(StoreError::backend)
    }
}
