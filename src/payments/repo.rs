use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{error::StoreError, store::postgres::map_db_error};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub status: String,
    pub payment_gateway: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub payment_date: OffsetDateTime,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInput {
    /// Defaults to the caller.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub order_id: Option<Uuid>,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub payment_gateway: Option<String>,
    /// Defaults to the time the row is written.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub payment_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PaymentInput {
    pub fn validate(&self) -> Result<(), String> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err("amount must be greater than zero".into());
        }
        if self.currency.trim().is_empty() {
            return Err("currency is required".into());
        }
        if self.payment_method.trim().is_empty() {
            return Err("payment_method is required".into());
        }
        if self.status.trim().is_empty() {
            return Err("status is required".into());
        }
        Ok(())
    }
}

const COLUMNS: &str = "id, user_id, order_id, amount, currency, payment_method, transaction_id, \
     status, payment_gateway, payment_date, notes, created_at, updated_at";

pub async fn create(db: &PgPool, caller: Uuid, input: PaymentInput) -> Result<Payment, StoreError> {
    let sql = format!(
        r#"
        INSERT INTO payments (id, user_id, order_id, amount, currency, payment_method,
                              transaction_id, status, payment_gateway, payment_date, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, now()), $11)
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, Payment>(&sql)
        .bind(Uuid::new_v4())
        .bind(input.user_id.unwrap_or(caller))
        .bind(input.order_id)
        .bind(input.amount)
        .bind(input.currency)
        .bind(input.payment_method)
        .bind(input.transaction_id)
        .bind(input.status)
        .bind(input.payment_gateway)
        .bind(input.payment_date)
        .bind(input.notes)
        .fetch_one(db)
        .await
        .map_err(map_db_error)
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<Payment, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM payments WHERE id = $1");
    sqlx::query_as::<_, Payment>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(map_db_error)?
        .ok_or(StoreError::NotFound)
}

pub async fn list(db: &PgPool) -> Result<Vec<Payment>, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM payments ORDER BY payment_date DESC");
    sqlx::query_as::<_, Payment>(&sql)
        .fetch_all(db)
        .await
        .map_err(map_db_error)
}

pub async fn update(db: &PgPool, id: Uuid, input: PaymentInput) -> Result<Payment, StoreError> {
    let sql = format!(
        r#"
        UPDATE payments
           SET user_id = COALESCE($2, user_id), order_id = $3, amount = $4, currency = $5,
               payment_method = $6, transaction_id = $7, status = $8, payment_gateway = $9,
               payment_date = COALESCE($10, payment_date), notes = $11, updated_at = now()
         WHERE id = $1
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, Payment>(&sql)
        .bind(id)
        .bind(input.user_id)
        .bind(input.order_id)
        .bind(input.amount)
        .bind(input.currency)
        .bind(input.payment_method)
        .bind(input.transaction_id)
        .bind(input.status)
        .bind(input.payment_gateway)
        .bind(input.payment_date)
        .bind(input.notes)
        .fetch_optional(db)
        .await
        .map_err(map_db_error)?
        .ok_or(StoreError::NotFound)
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM payments WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .map_err(map_db_error)?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}
