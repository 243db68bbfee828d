//! Persistence collaborators of the auth core.
//!
//! The authenticator and guard only see these traits; `postgres` backs them
//! with sqlx in production and `memory` backs them in tests.

use std::{future::Future, time::Duration};

use axum::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::token::Token,
    error::StoreError,
    users::model::{NewUser, User, UserChanges},
};

pub mod memory;
pub mod postgres;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when email or username is taken.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;
    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the token value already exists.
    async fn insert(&self, token: &Token) -> Result<(), StoreError>;
    async fn find_by_value(&self, value: &str) -> Result<Option<Token>, StoreError>;
}

/// Runs a store call, turning an elapsed `limit` into [`StoreError::Timeout`].
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout)?
}
