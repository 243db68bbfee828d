//! Error types shared across the service.
//!
//! Stores report [`StoreError`], the guard reports [`AuthError`], the
//! authenticator reports [`AuthnError`]. Handlers return [`AppError`], which
//! renders as `{"error": "<message>"}` with the matching status code.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Failures raised by a persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// A foreign-key or check constraint rejected the write.
    #[error("constraint violated: {0}")]
    Invalid(String),

    #[error("store call timed out")]
    Timeout,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Rejections produced by the authorization guard and by login.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization token required")]
    MissingToken,

    #[error("Authorization format must be Bearer <token>")]
    MalformedHeader,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("invalid email or password")]
    InvalidCredentials,
}

/// Failures of registration and authentication.
#[derive(Debug, Error)]
pub enum AuthnError {
    #[error("{0}")]
    Validation(String),

    #[error("user already exists")]
    AlreadyExists,

    #[error("invalid email or password")]
    InvalidCredentials,

    /// Credentials checked out but the session token could not be stored.
    #[error("failed to save token")]
    TokenIssuance(#[source] StoreError),

    #[error("password hashing failed")]
    Hash(#[source] anyhow::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps a store failure for the entity named `what` ("user", "course", ...).
    pub fn from_store(what: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound(format!("{what} not found")),
            StoreError::Conflict(constraint) => {
                warn!(%constraint, entity = what, "unique constraint rejected write");
                AppError::Conflict(format!("{what} conflicts with an existing record"))
            }
            StoreError::Invalid(constraint) => {
                warn!(%constraint, entity = what, "constraint rejected write");
                AppError::Validation(format!(
                    "{what} references a missing record or violates a constraint"
                ))
            }
            other => AppError::Internal(anyhow::Error::new(other).context(format!("{what} store"))),
        }
    }
}

impl From<AuthnError> for AppError {
    fn from(err: AuthnError) -> Self {
        match err {
            AuthnError::Validation(msg) => AppError::Validation(msg),
            AuthnError::AlreadyExists => AppError::Conflict("user already exists".into()),
            AuthnError::InvalidCredentials => AppError::Auth(AuthError::InvalidCredentials),
            AuthnError::TokenIssuance(source) => {
                AppError::Internal(anyhow::Error::new(source).context("failed to save token"))
            }
            AuthnError::Hash(source) => AppError::Internal(source.context("password hashing")),
            AuthnError::Store(source) => AppError::from_store("user", source),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Parses a path id, naming the entity in the 400 message.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation(format!("Invalid {what} ID")))
}
