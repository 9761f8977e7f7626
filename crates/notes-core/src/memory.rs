//! In-memory store
//!
//! Implements the same contracts as `PgStore` behind a tokio `RwLock`. Used
//! when no database URL is configured and by the test suites.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::store::{NoteRepository, StoreError, UserRepository};
use crate::{Note, NoteInput, User};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    notes: BTreeMap<i64, Note>,
    next_user_id: i64,
    next_note_id: i64,
}

/// In-memory user and note store
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::EmailAlreadyExists);
        }

        tables.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: tables.next_user_id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn set_refresh_token(&self, id: i64, token: Option<&str>) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.refresh_token = token.map(str::to_string);
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl NoteRepository for MemoryStore {
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Note>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .notes
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Note>, StoreError> {
        Ok(self.tables.read().await.notes.get(&id).cloned())
    }

    async fn create(&self, user_id: i64, input: &NoteInput) -> Result<Note, StoreError> {
        let mut tables = self.tables.write().await;
        tables.next_note_id += 1;
        let now = Utc::now();
        let note = Note {
            id: tables.next_note_id,
            user_id,
            title: input.title.clone(),
            content: input.content.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.notes.insert(note.id, note.clone());

        Ok(note)
    }

    async fn update(&self, id: i64, input: &NoteInput) -> Result<Option<Note>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.notes.get_mut(&id).map(|note| {
            note.title = input.title.clone();
            note.content = input.content.clone();
            note.updated_at = Utc::now();
            note.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.notes.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    #[test]
    fn test_create_and_find_user() {
        block_on(async {
            let store = MemoryStore::new();
            let user = store.create_user("a@b.com", "hash").await.unwrap();

            assert_eq!(user.id, 1);
            assert!(user.refresh_token.is_none());

            let by_email = store.find_by_email("a@b.com").await.unwrap().unwrap();
            assert_eq!(by_email, user);

            let by_id = UserRepository::find_by_id(&store, user.id).await.unwrap();
            assert_eq!(by_id, Some(user));

            assert!(store.find_by_email("x@b.com").await.unwrap().is_none());
        });
    }

    #[test]
    fn test_duplicate_email_rejected() {
        block_on(async {
            let store = MemoryStore::new();
            store.create_user("a@b.com", "hash").await.unwrap();

            let result = store.create_user("a@b.com", "other").await;
            assert!(matches!(result, Err(StoreError::EmailAlreadyExists)));
        });
    }

    #[test]
    fn test_refresh_token_replace_and_clear() {
        block_on(async {
            let store = MemoryStore::new();
            let user = store.create_user("a@b.com", "hash").await.unwrap();

            assert!(store.set_refresh_token(user.id, Some("first")).await.unwrap());
            assert!(store.set_refresh_token(user.id, Some("second")).await.unwrap());
            let stored = store.find_by_email("a@b.com").await.unwrap().unwrap();
            assert!(stored.holds_refresh_token("second"));
            assert!(!stored.holds_refresh_token("first"));

            assert!(store.set_refresh_token(user.id, None).await.unwrap());
            let stored = store.find_by_email("a@b.com").await.unwrap().unwrap();
            assert!(stored.refresh_token.is_none());

            // Unknown user: nothing to update
            assert!(!store.set_refresh_token(999, None).await.unwrap());
        });
    }

    #[test]
    fn test_notes_are_scoped_to_owner() {
        block_on(async {
            let store = MemoryStore::new();
            let input = NoteInput {
                title: "t".to_string(),
                content: "c".to_string(),
            };

            let mine = store.create(1, &input).await.unwrap();
            store.create(2, &input).await.unwrap();
            let mine2 = store.create(1, &input).await.unwrap();

            let ids: Vec<i64> = store
                .list_by_user(1)
                .await
                .unwrap()
                .iter()
                .map(|n| n.id)
                .collect();
            assert_eq!(ids, vec![mine.id, mine2.id]);
        });
    }

    #[test]
    fn test_note_update_and_delete() {
        block_on(async {
            let store = MemoryStore::new();
            let note = store
                .create(
                    1,
                    &NoteInput {
                        title: "old".to_string(),
                        content: String::new(),
                    },
                )
                .await
                .unwrap();

            let changed = NoteInput {
                title: "new".to_string(),
                content: "body".to_string(),
            };
            let updated = store.update(note.id, &changed).await.unwrap().unwrap();
            assert_eq!(updated.title, "new");
            assert_eq!(updated.content, "body");
            assert_eq!(updated.created_at, note.created_at);

            assert!(store.update(42, &changed).await.unwrap().is_none());

            assert!(store.delete(note.id).await.unwrap());
            assert!(!store.delete(note.id).await.unwrap());
            assert!(NoteRepository::find_by_id(&store, note.id)
                .await
                .unwrap()
                .is_none());
        });
    }
}
