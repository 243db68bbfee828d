use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{error::StoreError, store::postgres::map_db_error};

/// A coach-owned space grouping members, sessions and courses.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Space {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub coach_id: Option<Uuid>,
    pub member_count: i32,
    pub session_count: i32,
    pub course_count: i32,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpaceInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to the caller.
    #[serde(default)]
    pub coach_id: Option<Uuid>,
    #[serde(default)]
    pub member_count: i32,
    #[serde(default)]
    pub session_count: i32,
    #[serde(default)]
    pub course_count: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl SpaceInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".into());
        }
        if self.member_count < 0 || self.session_count < 0 || self.course_count < 0 {
            return Err("counts must not be negative".into());
        }
        Ok(())
    }
}

const COLUMNS: &str = "id, name, description, coach_id, member_count, session_count, \
     course_count, active, created_at, updated_at";

pub async fn create(db: &PgPool, caller: Uuid, input: SpaceInput) -> Result<Space, StoreError> {
    let sql = format!(
        r#"
        INSERT INTO spaces (id, name, description, coach_id, member_count, session_count,
                            course_count, active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, Space>(&sql)
        .bind(Uuid::new_v4())
        .bind(input.name)
        .bind(input.description)
        .bind(input.coach_id.unwrap_or(caller))
        .bind(input.member_count)
        .bind(input.session_count)
        .bind(input.course_count)
        .bind(input.active)
        .fetch_one(db)
        .await
        .map_err(map_db_error)
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<Space, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM spaces WHERE id = $1");
    sqlx::query_as::<_, Space>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(map_db_error)?
        .ok_or(StoreError::NotFound)
}

pub async fn list(db: &PgPool) -> Result<Vec<Space>, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM spaces ORDER BY created_at DESC");
    sqlx::query_as::<_, Space>(&sql)
        .fetch_all(db)
        .await
        .map_err(map_db_error)
}

pub async fn update(db: &PgPool, id: Uuid, input: SpaceInput) -> Result<Space, StoreError> {
    let sql = format!(
        r#"
        UPDATE spaces
           SET name = $2, description = $3, coach_id = COALESCE($4, coach_id),
               member_count = $5, session_count = $6, course_count = $7, active = $8,
               updated_at = now()
         WHERE id = $1
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, Space>(&sql)
        .bind(id)
        .bind(input.name)
        .bind(input.description)
        .bind(input.coach_id)
        .bind(input.member_count)
        .bind(input.session_count)
        .bind(input.course_count)
        .bind(input.active)
        .fetch_optional(db)
        .await
        .map_err(map_db_error)?
        .ok_or(StoreError::NotFound)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM spaces WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .map_err(map_db_error)?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}
