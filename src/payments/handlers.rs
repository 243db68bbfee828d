use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::repo::{self, Payment, PaymentInput};
use crate::{
    auth::AuthUser,
    error::{parse_id, AppError},
    state::AppState,
    store::bounded,
};

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments).post(create_payment))
        .route(
            "/payments/:id",
            get(get_payment).put(update_payment).delete(delete_payment),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_payment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<PaymentInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let Json(input) = payload?;
    input.validate().map_err(AppError::Validation)?;

    let payment = bounded(state.config.store_timeout(), repo::create(&state.db, user_id, input))
        .await
        .map_err(|e| AppError::from_store("payment", e))?;
    info!(payment_id = %payment.id, %user_id, "payment created");
    Ok((StatusCode::CREATED, Json(payment)))
}

#[instrument(skip(state))]
pub async fn list_payments(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, AppError> {
    let payments = bounded(state.config.store_timeout(), repo::list(&state.db))
        .await
        .map_err(|e| AppError::from_store("payment", e))?;
    Ok(Json(json!({ "payments": payments })))
}

#[instrument(skip(state))]
pub async fn get_payment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Payment>, AppError> {
    let id = parse_id(&id, "payment")?;
    let payment = bounded(state.config.store_timeout(), repo::get(&state.db, id))
        .await
        .map_err(|e| AppError::from_store("payment", e))?;
    Ok(Json(payment))
}

#[instrument(skip(state, payload))]
pub async fn update_payment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<PaymentInput>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "payment")?;
    let Json(input) = payload?;
    input.validate().map_err(AppError::Validation)?;

    let payment = bounded(state.config.store_timeout(), repo::update(&state.db, id, input))
        .await
        .map_err(|e| AppError::from_store("payment", e))?;
    info!(payment_id = %id, %user_id, "payment updated");
    Ok(Json(json!({ "message": "Payment updated successfully", "payment": payment })))
}

#[instrument(skip(state))]
pub async fn delete_payment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "payment")?;
    bounded(state.config.store_timeout(), repo::delete(&state.db, id))
        .await
        .map_err(|e| AppError::from_store("payment", e))?;
    info!(payment_id = %id, %user_id, "payment deleted");
    Ok(Json(json!({ "message": "Payment deleted successfully" })))
}
