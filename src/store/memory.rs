//! In-process stores with the same uniqueness and cascade rules as the
//! Postgres schema.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use axum::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{TokenStore, UserStore};
use crate::{
    auth::token::Token,
    error::StoreError,
    users::model::{NewUser, User, UserChanges},
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    /// Tokens dropped when their owner is deleted (`ON DELETE CASCADE`).
    tokens: Option<Arc<MemoryTokenStore>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// User store whose deletes also remove the user's tokens from `tokens`.
    pub fn with_tokens(tokens: Arc<MemoryTokenStore>) -> Self {
        Self {
            users: Mutex::default(),
            tokens: Some(tokens),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, User>> {
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn taken(
    users: &HashMap<Uuid, User>,
    skip: Option<Uuid>,
    username: &str,
    email: &str,
) -> Option<StoreError> {
    for u in users.values().filter(|u| Some(u.id) != skip) {
        if u.email == email {
            return Some(StoreError::Conflict("users_email_key".into()));
        }
        if u.username == username {
            return Some(StoreError::Conflict("users_username_key".into()));
        }
    }
    None
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.lock();
        if let Some(conflict) = taken(&users, None, &new.username, &new.email) {
            return Err(conflict);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: new.id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut all: Vec<User> = self.lock().values().cloned().collect();
        all.sort_by_key(|u| u.created_at);
        Ok(all)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, StoreError> {
        let mut users = self.lock();
        let mut updated = users.get(&id).cloned().ok_or(StoreError::NotFound)?;
        changes.apply(&mut updated);
        if let Some(conflict) = taken(&users, Some(id), &updated.username, &updated.email) {
            return Err(conflict);
        }
        updated.updated_at = OffsetDateTime::now_utc();
        users.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.lock().remove(&id).ok_or(StoreError::NotFound)?;
        if let Some(tokens) = &self.tokens {
            tokens.remove_for_user(id);
        }
        Ok(())
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError> {
        if let Some(u) = self.lock().get_mut(&id) {
            u.last_login = Some(at);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, Token>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Token>> {
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove_for_user(&self, user_id: Uuid) {
        self.lock().retain(|_, t| t.user_id != user_id);
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, token: &Token) -> Result<(), StoreError> {
        let mut tokens = self.lock();
        if tokens.contains_key(&token.token) {
            return Err(StoreError::Conflict("tokens_token_key".into()));
        }
        tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<Token>, StoreError> {
        Ok(self.lock().get(value).cloned())
    }
}
