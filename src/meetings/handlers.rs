use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::repo::{self, Meeting, MeetingInput};
use crate::{
    auth::AuthUser,
    error::{parse_id, AppError},
    state::AppState,
    store::bounded,
};

pub fn meeting_routes() -> Router<AppState> {
    Router::new()
        .route("/meetings", get(list_meetings).post(create_meeting))
        .route(
            "/meetings/:id",
            get(get_meeting).put(update_meeting).delete(delete_meeting),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_meeting(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<MeetingInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Meeting>), AppError> {
    let Json(input) = payload?;
    input.validate().map_err(AppError::Validation)?;

    let meeting = bounded(state.config.store_timeout(), repo::create(&state.db, input))
        .await
        .map_err(|e| AppError::from_store("meeting", e))?;
    info!(meeting_id = %meeting.id, %user_id, "meeting created");
    Ok((StatusCode::CREATED, Json(meeting)))
}

#[instrument(skip(state))]
pub async fn list_meetings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, AppError> {
    let meetings = bounded(state.config.store_timeout(), repo::list(&state.db))
        .await
        .map_err(|e| AppError::from_store("meeting", e))?;
    Ok(Json(json!({ "meetings": meetings })))
}

#[instrument(skip(state))]
pub async fn get_meeting(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Meeting>, AppError> {
    let id = parse_id(&id, "meeting")?;
    let meeting = bounded(state.config.store_timeout(), repo::get(&state.db, id))
        .await
        .map_err(|e| AppError::from_store("meeting", e))?;
    Ok(Json(meeting))
}

#[instrument(skip(state, payload))]
pub async fn update_meeting(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<MeetingInput>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "meeting")?;
    let Json(input) = payload?;
    input.validate().map_err(AppError::Validation)?;

    let meeting = bounded(state.config.store_timeout(), repo::update(&state.db, id, input))
        .await
        .map_err(|e| AppError::from_store("meeting", e))?;
    info!(meeting_id = %id, %user_id, "meeting updated");
    Ok(Json(json!({ "message": "Meeting updated successfully", "meeting": meeting })))
}

#[instrument(skip(state))]
pub async fn delete_meeting(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "meeting")?;
    bounded(state.config.store_timeout(), repo::delete(&state.db, id))
        .await
        .map_err(|e| AppError::from_store("meeting", e))?;
    info!(meeting_id = %id, %user_id, "meeting deleted");
    Ok(Json(json!({ "message": "Meeting deleted successfully" })))
}
