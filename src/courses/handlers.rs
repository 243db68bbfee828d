use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::repo::{self, Course, CourseInput};
use crate::{
    auth::AuthUser,
    error::{parse_id, AppError},
    state::AppState,
    store::bounded,
};

pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/:id",
            get(get_course).put(update_course).delete(delete_course),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_course(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CourseInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let Json(input) = payload?;
    input.validate().map_err(AppError::Validation)?;

    let course = bounded(state.config.store_timeout(), repo::create(&state.db, user_id, input))
        .await
        .map_err(|e| AppError::from_store("course", e))?;
    info!(course_id = %course.id, %user_id, "course created");
    Ok((StatusCode::CREATED, Json(course)))
}

#[instrument(skip(state))]
pub async fn list_courses(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, AppError> {
    let courses = bounded(state.config.store_timeout(), repo::list(&state.db))
        .await
        .map_err(|e| AppError::from_store("course", e))?;
    Ok(Json(json!({ "courses": courses })))
}

#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Course>, AppError> {
    let id = parse_id(&id, "course")?;
    let course = bounded(state.config.store_timeout(), repo::get(&state.db, id))
        .await
        .map_err(|e| AppError::from_store("course", e))?;
    Ok(Json(course))
}

#[instrument(skip(state, payload))]
pub async fn update_course(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<CourseInput>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "course")?;
    let Json(input) = payload?;
    input.validate().map_err(AppError::Validation)?;

    let course = bounded(state.config.store_timeout(), repo::update(&state.db, id, input))
        .await
        .map_err(|e| AppError::from_store("course", e))?;
    info!(course_id = %id, %user_id, "course updated");
    Ok(Json(json!({ "message": "Course updated successfully", "course": course })))
}

#[instrument(skip(state))]
pub async fn delete_course(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "course")?;
    bounded(state.config.store_timeout(), repo::delete(&state.db, id))
        .await
        .map_err(|e| AppError::from_store("course", e))?;
    info!(course_id = %id, %user_id, "course deleted");
    Ok(Json(json!({ "message": "Course deleted successfully" })))
}
