use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{error::StoreError, store::postgres::map_db_error};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub user_id: Uuid, // creator
    pub title: String,
    pub description: Option<String>,
    pub duration: String, // e.g. "3 weeks"
    pub version: Uuid,
    pub category: Option<String>,
    pub enrolled_count: i32,
    pub content_url: Option<String>,
    pub outline: Option<String>,
    pub status: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Create/replace body.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub duration: String,
    #[serde(default)]
    pub version: Option<Uuid>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub enrolled_count: i32,
    #[serde(default)]
    pub content_url: Option<String>,
    #[serde(default)]
    pub outline: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl CourseInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".into());
        }
        if self.duration.trim().is_empty() {
            return Err("duration is required".into());
        }
        if self.enrolled_count < 0 {
            return Err("enrolled_count must not be negative".into());
        }
        Ok(())
    }
}

const COLUMNS: &str = "id, user_id, title, description, duration, version, category, \
     enrolled_count, content_url, outline, status, created_at, updated_at";

pub async fn create(db: &PgPool, user_id: Uuid, input: CourseInput) -> Result<Course, StoreError> {
    let sql = format!(
        r#"
        INSERT INTO courses (id, user_id, title, description, duration, version, category,
                             enrolled_count, content_url, outline, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, Course>(&sql)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(input.title)
        .bind(input.description)
        .bind(input.duration)
        .bind(input.version.unwrap_or_else(Uuid::new_v4))
        .bind(input.category)
        .bind(input.enrolled_count)
        .bind(input.content_url)
        .bind(input.outline)
        .bind(input.status)
        .fetch_one(db)
        .await
        .map_err(map_db_error)
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<Course, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM courses WHERE id = $1 AND deleted_at IS NULL");
    sqlx::query_as::<_, Course>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(map_db_error)?
        .ok_or(StoreError::NotFound)
}

pub async fn list(db: &PgPool) -> Result<Vec<Course>, StoreError> {
    let sql = format!(
        "SELECT {COLUMNS} FROM courses WHERE deleted_at IS NULL ORDER BY created_at DESC"
    );
    sqlx::query_as::<_, Course>(&sql)
        .fetch_all(db)
        .await
        .map_err(map_db_error)
}

pub async fn update(db: &PgPool, id: Uuid, input: CourseInput) -> Result<Course, StoreError> {
    let sql = format!(
        r#"
        UPDATE courses
           SET title = $2, description = $3, duration = $4,
               version = COALESCE($5, version), category = $6, enrolled_count = $7,
               content_url = $8, outline = $9, status = $10, updated_at = now()
         WHERE id = $1 AND deleted_at IS NULL
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, Course>(&sql)
        .bind(id)
        .bind(input.title)
        .bind(input.description)
        .bind(input.duration)
        .bind(input.version)
        .bind(input.category)
        .bind(input.enrolled_count)
        .bind(input.content_url)
        .bind(input.outline)
        .bind(input.status)
        .fetch_optional(db)
        .await
        .map_err(map_db_error)?
        .ok_or(StoreError::NotFound)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .map_err(map_db_error)?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}
