use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{error::StoreError, store::postgres::map_db_error};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Meeting {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    pub location: Option<String>,
    pub attendee_ids: Vec<Uuid>,
    pub attendee_names: Vec<String>,
    pub attendee_emails: Vec<String>,
    pub attendee_status: Vec<String>, // parallel to attendee_ids: "invited", "joined", ...
    pub meeting_type: Option<String>, // "virtual" | "in-person"
    pub status: Option<String>,
    pub join_url: Vec<String>,
    pub maximum_capacity: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub duration: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub attendee_ids: Vec<Uuid>,
    #[serde(default)]
    pub attendee_names: Vec<String>,
    #[serde(default)]
    pub attendee_emails: Vec<String>,
    #[serde(default)]
    pub attendee_status: Vec<String>,
    #[serde(default)]
    pub meeting_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub join_url: Vec<String>,
    #[serde(default)]
    pub maximum_capacity: Option<i32>,
}

impl MeetingInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".into());
        }
        if self.duration.trim().is_empty() {
            return Err("duration is required".into());
        }
        if self.end_time <= self.start_time {
            return Err("end_time must be after start_time".into());
        }
        if matches!(self.maximum_capacity, Some(c) if c < 0) {
            return Err("maximum_capacity must not be negative".into());
        }
        Ok(())
    }
}

const COLUMNS: &str = "id, title, description, duration, start_time, end_time, location, \
     attendee_ids, attendee_names, attendee_emails, attendee_status, meeting_type, status, \
     join_url, maximum_capacity, created_at, updated_at";

pub async fn create(db: &PgPool, input: MeetingInput) -> Result<Meeting, StoreError> {
    let sql = format!(
        r#"
        INSERT INTO meetings (id, title, description, duration, start_time, end_time, location,
                              attendee_ids, attendee_names, attendee_emails, attendee_status,
                              meeting_type, status, join_url, maximum_capacity)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, Meeting>(&sql)
        .bind(Uuid::new_v4())
        .bind(input.title)
        .bind(input.description)
        .bind(input.duration)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(input.location)
        .bind(input.attendee_ids)
        .bind(input.attendee_names)
        .bind(input.attendee_emails)
        .bind(input.attendee_status)
        .bind(input.meeting_type)
        .bind(input.status)
        .bind(input.join_url)
        .bind(input.maximum_capacity)
        .fetch_one(db)
        .await
        .map_err(map_db_error)
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<Meeting, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM meetings WHERE id = $1 AND deleted_at IS NULL");
    sqlx::query_as::<_, Meeting>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(map_db_error)?
        .ok_or(StoreError::NotFound)
}

pub async fn list(db: &PgPool) -> Result<Vec<Meeting>, StoreError> {
    let sql = format!(
        "SELECT {COLUMNS} FROM meetings WHERE deleted_at IS NULL ORDER BY start_time ASC"
    );
    sqlx::query_as::<_, Meeting>(&sql)
        .fetch_all(db)
        .await
        .map_err(map_db_error)
}

pub async fn update(db: &PgPool, id: Uuid, input: MeetingInput) -> Result<Meeting, StoreError> {
    let sql = format!(
        r#"
        UPDATE meetings
           SET title = $2, description = $3, duration = $4, start_time = $5, end_time = $6,
               location = $7, attendee_ids = $8, attendee_names = $9, attendee_emails = $10,
               attendee_status = $11, meeting_type = $12, status = $13, join_url = $14,
               maximum_capacity = $15, updated_at = now()
         WHERE id = $1 AND deleted_at IS NULL
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, Meeting>(&sql)
        .bind(id)
        .bind(input.title)
        .bind(input.description)
        .bind(input.duration)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(input.location)
        .bind(input.attendee_ids)
        .bind(input.attendee_names)
        .bind(input.attendee_emails)
        .bind(input.attendee_status)
        .bind(input.meeting_type)
        .bind(input.status)
        .bind(input.join_url)
        .bind(input.maximum_capacity)
        .fetch_optional(db)
        .await
        .map_err(map_db_error)?
        .ok_or(StoreError::NotFound)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM meetings WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .map_err(map_db_error)?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}
