use std::{sync::Arc, time::Duration as StdDuration};

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{password, token::Token};
use crate::{
    error::{AuthnError, StoreError},
    state::AppState,
    store::{bounded, TokenStore, UserStore},
    users::model::{NewUser, User},
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration input. The password is plaintext until hashed here.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Verifies credentials and issues session tokens.
#[derive(Clone)]
pub struct Authenticator {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
    token_ttl: Duration,
    store_timeout: StdDuration,
}

impl FromRef<AppState> for Authenticator {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.users.clone(),
            state.tokens.clone(),
            state.config.token_ttl(),
            state.config.store_timeout(),
        )
    }
}

impl Authenticator {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        token_ttl: Duration,
        store_timeout: StdDuration,
    ) -> Self {
        Self {
            users,
            tokens,
            token_ttl,
            store_timeout,
        }
    }

    pub async fn register(&self, input: Registration) -> Result<User, AuthnError> {
        let email = normalize_email(&input.email);
        let username = input.username.trim().to_string();

        if !is_valid_email(&email) {
            return Err(AuthnError::Validation("Invalid email".into()));
        }
        if username.is_empty() {
            return Err(AuthnError::Validation("Username is required".into()));
        }
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthnError::Validation("Password too short".into()));
        }

        // Fast path only; the unique constraint below is authoritative.
        if bounded(self.store_timeout, self.users.find_by_email(&email))
            .await?
            .is_some()
        {
            warn!(email = %email, "email already registered");
            return Err(AuthnError::AlreadyExists);
        }

        let password_hash = hash_blocking(input.password).await?;
        let new_user = NewUser {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
        };

        match bounded(self.store_timeout, self.users.insert(new_user)).await {
            Ok(user) => {
                info!(user_id = %user.id, email = %user.email, "user registered");
                Ok(user)
            }
            Err(StoreError::Conflict(constraint)) => {
                warn!(%constraint, "registration hit unique constraint");
                Err(AuthnError::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, Token), AuthnError> {
        let email = normalize_email(email);

        let user = match bounded(self.store_timeout, self.users.find_by_email(&email)).await? {
            Some(u) => u,
            None => {
                warn!(email = %email, "login unknown email");
                return Err(AuthnError::InvalidCredentials);
            }
        };

        let ok = verify_blocking(password.to_string(), user.password_hash.clone())
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, user_id = %user.id, "stored password hash unusable");
                false
            });
        if !ok {
            warn!(email = %email, user_id = %user.id, "login invalid password");
            return Err(AuthnError::InvalidCredentials);
        }
        if !user.is_active {
            warn!(user_id = %user.id, "login for deactivated user");
            return Err(AuthnError::InvalidCredentials);
        }

        let now = OffsetDateTime::now_utc();
        let token = Token::issue(user.id, self.token_ttl, now);
        if let Err(e) = bounded(self.store_timeout, self.tokens.insert(&token)).await {
            error!(error = %e, user_id = %user.id, "token insert failed after credential check");
            return Err(AuthnError::TokenIssuance(e));
        }
        debug!(user_id = %user.id, expires_at = %token.expires_at, "token issued");

        if let Err(e) = bounded(self.store_timeout, self.users.record_login(user.id, now)).await {
            warn!(error = %e, user_id = %user.id, "could not record last login");
        }

        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok((
            User {
                last_login: Some(now),
                ..user
            },
            token,
        ))
    }
}

/// Hashes on the blocking pool; argon2 is deliberately slow.
pub(crate) async fn hash_blocking(plain: String) -> Result<String, AuthnError> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| AuthnError::Hash(anyhow::Error::new(e)))?
        .map_err(AuthnError::Hash)
}

async fn verify_blocking(plain: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash)).await?
}
