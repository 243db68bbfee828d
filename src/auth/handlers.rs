use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        authenticator::{Authenticator, Registration},
        dto::{AuthenticateRequest, AuthenticateResponse, RegisterRequest},
    },
    error::AppError,
    state::AppState,
    users::model::User,
};

/// Public routes: registration and login.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/authenticate", post(authenticate))
}

#[instrument(skip(auth, payload))]
pub async fn register(
    State(auth): State<Authenticator>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let Json(payload) = payload?;
    let user = auth
        .register(Registration {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await?;
    Ok(Json(user))
}

#[instrument(skip(auth, payload))]
pub async fn authenticate(
    State(auth): State<Authenticator>,
    payload: Result<Json<AuthenticateRequest>, JsonRejection>,
) -> Result<Json<AuthenticateResponse>, AppError> {
    let Json(payload) = payload?;
    let (user, token) = auth.authenticate(&payload.email, &payload.password).await?;
    Ok(Json(AuthenticateResponse {
        user,
        token: token.token,
        expires_at: token.expires_at,
    }))
}
