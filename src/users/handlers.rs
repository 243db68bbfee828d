use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        authenticator::{hash_blocking, is_valid_email, normalize_email, MIN_PASSWORD_LEN},
        AuthUser,
    },
    error::{parse_id, AppError},
    state::AppState,
    store::bounded,
    users::model::{User, UserChanges},
};

/// Partial update body for `PUT /users/:id`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<UserList>, AppError> {
    let users = bounded(state.config.store_timeout(), state.users.list())
        .await
        .map_err(|e| AppError::from_store("user", e))?;
    Ok(Json(UserList { users }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UserEnvelope>, AppError> {
    let id = parse_id(&id, "user")?;
    let user = bounded(state.config.store_timeout(), state.users.find_by_id(id))
        .await
        .map_err(|e| AppError::from_store("user", e))?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;
    Ok(Json(UserEnvelope { user }))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "user")?;
    let Json(body) = payload?;
    let changes = validate_changes(body).await?;

    let user = bounded(state.config.store_timeout(), state.users.update(id, changes))
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %id, "update user failed");
            AppError::from_store("user", e)
        })?;

    info!(user_id = %id, %caller, "user updated");
    Ok(Json(json!({ "message": "User updated successfully", "user": user })))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "user")?;
    bounded(state.config.store_timeout(), state.users.delete(id))
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %id, "delete user failed");
            AppError::from_store("user", e)
        })?;

    info!(user_id = %id, %caller, "user deleted");
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

async fn validate_changes(body: UpdateUserRequest) -> Result<UserChanges, AppError> {
    let email = match body.email {
        Some(raw) => {
            let email = normalize_email(&raw);
            if !is_valid_email(&email) {
                return Err(AppError::Validation("Invalid email".into()));
            }
            Some(email)
        }
        None => None,
    };

    let username = match body.username.map(|u| u.trim().to_string()) {
        Some(u) if u.is_empty() => {
            return Err(AppError::Validation("Username is required".into()))
        }
        other => other,
    };

    let password_hash = match body.password {
        Some(p) if p.chars().count() < MIN_PASSWORD_LEN => {
            return Err(AppError::Validation("Password too short".into()))
        }
        Some(p) => Some(hash_blocking(p).await?),
        None => None,
    };

    Ok(UserChanges {
        username,
        email,
        password_hash,
        first_name: body.first_name,
        last_name: body.last_name,
        is_active: body.is_active,
    })
}
