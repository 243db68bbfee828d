use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::repo::{self, Space, SpaceInput};
use crate::{
    auth::AuthUser,
    error::{parse_id, AppError},
    state::AppState,
    store::bounded,
};

pub fn space_routes() -> Router<AppState> {
    Router::new()
        .route("/spaces", get(list_spaces).post(create_space))
        .route(
            "/spaces/:id",
            get(get_space).put(update_space).delete(delete_space),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_space(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<SpaceInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Space>), AppError> {
    let Json(input) = payload?;
    input.validate().map_err(AppError::Validation)?;

    let space = bounded(state.config.store_timeout(), repo::create(&state.db, user_id, input))
        .await
        .map_err(|e| AppError::from_store("space", e))?;
    info!(space_id = %space.id, %user_id, "space created");
    Ok((StatusCode::CREATED, Json(space)))
}

#[instrument(skip(state))]
pub async fn list_spaces(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, AppError> {
    let spaces = bounded(state.config.store_timeout(), repo::list(&state.db))
        .await
        .map_err(|e| AppError::from_store("space", e))?;
    Ok(Json(json!({ "spaces": spaces })))
}

#[instrument(skip(state))]
pub async fn get_space(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Space>, AppError> {
    let id = parse_id(&id, "space")?;
    let space = bounded(state.config.store_timeout(), repo::get(&state.db, id))
        .await
        .map_err(|e| AppError::from_store("space", e))?;
    Ok(Json(space))
}

#[instrument(skip(state, payload))]
pub async fn update_space(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<SpaceInput>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "space")?;
    let Json(input) = payload?;
    input.validate().map_err(AppError::Validation)?;

    let space = bounded(state.config.store_timeout(), repo::update(&state.db, id, input))
        .await
        .map_err(|e| AppError::from_store("space", e))?;
    info!(space_id = %id, %user_id, "space updated");
    Ok(Json(json!({ "message": "Space updated successfully", "space": space })))
}

#[instrument(skip(state))]
pub async fn delete_space(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "space")?;
    bounded(state.config.store_timeout(), repo::delete(&state.db, id))
        .await
        .map_err(|e| AppError::from_store("space", e))?;
    info!(space_id = %id, %user_id, "space deleted");
    Ok(Json(json!({ "message": "Space deleted successfully" })))
}
