use axum::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{debug, error};
use uuid::Uuid;

use super::{TokenStore, UserStore};
use crate::{
    auth::token::Token,
    error::StoreError,
    users::model::{NewUser, User, UserChanges},
};

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
     is_active, last_login, created_at, updated_at, deleted_at";

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Maps a sqlx error. Unique violations become [`StoreError::Conflict`];
/// foreign-key and check violations become [`StoreError::Invalid`].
pub fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(mapped) = classify(db_err.code().as_deref(), db_err.constraint()) {
            return mapped;
        }
    }
    StoreError::Database(err)
}

fn classify(code: Option<&str>, constraint: Option<&str>) -> Option<StoreError> {
    let constraint = || constraint.unwrap_or("unnamed").to_string();
    match code? {
        UNIQUE_VIOLATION => Some(StoreError::Conflict(constraint())),
        FOREIGN_KEY_VIOLATION | CHECK_VIOLATION => Some(StoreError::Invalid(constraint())),
        _ => None,
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .fetch_one(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, email = %user.email, "insert user failed");
                map_db_error(e)
            })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(map_db_error)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(map_db_error)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.db)
            .await
            .map_err(map_db_error)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            UPDATE users
               SET username      = COALESCE($2, username),
                   email         = COALESCE($3, email),
                   password_hash = COALESCE($4, password_hash),
                   first_name    = COALESCE($5, first_name),
                   last_name     = COALESCE($6, last_name),
                   is_active     = COALESCE($7, is_active),
                   updated_at    = now()
             WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.username)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .bind(changes.is_active)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %id, "update user failed");
                map_db_error(e)
            })?;
        user.ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %id, "delete user failed");
                map_db_error(e)
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        debug!(user_id = %id, "user deleted");
        Ok(())
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.db)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgTokenStore {
    db: PgPool,
}

impl PgTokenStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn insert(&self, token: &Token) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tokens (id, user_id, token, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(token.created_at)
        .bind(token.updated_at)
        .execute(&self.db)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %token.user_id, "insert token failed");
            map_db_error(e)
        })?;
        Ok(())
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<Token>, StoreError> {
        sqlx::query_as::<_, Token>(
            r#"
            SELECT id, user_id, token, expires_at, created_at, updated_at
            FROM tokens
            WHERE token = $1
            "#,
        )
        .bind(value)
        .fetch_optional(&self.db)
        .await
        .map_err(map_db_error)
    }
}
