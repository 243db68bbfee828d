//! Bearer-token authorization for protected routes.
//!
//! [`Guard::authorize_at`] is the decision itself: it parses the
//! `Authorization` header, resolves the token and checks expiry. Any store
//! failure is reported as an invalid token. [`require_auth`] wires the
//! decision into axum and binds the resolved user id into the request's
//! [`RequestContext`].

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{FromRef, Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use super::extractors::RequestContext;
use crate::{
    error::{AppError, AuthError},
    state::AppState,
    store::{bounded, TokenStore},
};

pub const BEARER_SCHEME: &str = "Bearer";

#[derive(Clone)]
pub struct Guard {
    tokens: Arc<dyn TokenStore>,
    store_timeout: Duration,
}

impl FromRef<AppState> for Guard {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.tokens.clone(), state.config.store_timeout())
    }
}

/// Extracts the token from `Bearer <token>`; exactly one space, non-empty token.
pub fn parse_bearer(header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let raw = match header {
        None => return Err(AuthError::MissingToken),
        Some(v) if v.is_empty() => return Err(AuthError::MissingToken),
        Some(v) => v.to_str().map_err(|_| AuthError::MalformedHeader)?,
    };

    let mut parts = raw.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER_SCHEME), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

impl Guard {
    pub fn new(tokens: Arc<dyn TokenStore>, store_timeout: Duration) -> Self {
        Self {
            tokens,
            store_timeout,
        }
    }

    pub async fn authorize(&self, header: Option<&HeaderValue>) -> Result<Uuid, AuthError> {
        self.authorize_at(header, OffsetDateTime::now_utc()).await
    }

    /// Resolves the header to a user id as of `now`.
    pub async fn authorize_at(
        &self,
        header: Option<&HeaderValue>,
        now: OffsetDateTime,
    ) -> Result<Uuid, AuthError> {
        let value = parse_bearer(header).map_err(|e| {
            warn!(reason = %e, "rejecting request");
            e
        })?;

        let token = match bounded(self.store_timeout, self.tokens.find_by_value(value)).await {
            Ok(Some(t)) => t,
            Ok(None) => {
                warn!("token lookup failed: not found");
                return Err(AuthError::InvalidToken);
            }
            Err(e) => {
                warn!(error = %e, "token lookup failed");
                return Err(AuthError::InvalidToken);
            }
        };

        if token.is_expired_at(now) {
            warn!(expires_at = %token.expires_at, user_id = %token.user_id, "token expired");
            return Err(AuthError::ExpiredToken);
        }

        debug!(user_id = %token.user_id, "request authorized");
        Ok(token.user_id)
    }
}

/// Middleware for protected routers; rejects with 401 before the handler runs.
pub async fn require_auth(
    State(guard): State<Guard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorization = request.headers().get(header::AUTHORIZATION).cloned();
    let user_id = guard.authorize(authorization.as_ref()).await?;

    request
        .extensions_mut()
        .insert(RequestContext::authenticated(user_id));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::async_trait;
    use time::Duration as TimeDuration;

    use super::*;
    use crate::{auth::token::Token, error::StoreError, store::memory::MemoryTokenStore};

    /// Counts lookups so tests can prove malformed headers never reach the store.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryTokenStore,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl TokenStore for CountingStore {
        async fn insert(&self, token: &Token) -> Result<(), StoreError> {
            self.inner.insert(token).await
        }
        async fn find_by_value(&self, value: &str) -> Result<Option<Token>, StoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_value(value).await
        }
    }

    struct FailingStore;

    #[async_trait]
    impl TokenStore for FailingStore {
        async fn insert(&self, _token: &Token) -> Result<(), StoreError> {
            Err(StoreError::Timeout)
        }
        async fn find_by_value(&self, _value: &str) -> Result<Option<Token>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    fn header(v: &str) -> HeaderValue {
        HeaderValue::from_str(v).unwrap()
    }

    fn guard_with(store: Arc<CountingStore>) -> Guard {
        Guard::new(store, Duration::from_secs(5))
    }

    #[test]
    fn parse_bearer_cases() {
        assert_eq!(parse_bearer(None), Err(AuthError::MissingToken));
        assert_eq!(parse_bearer(Some(&header(""))), Err(AuthError::MissingToken));
        assert_eq!(parse_bearer(Some(&header("Bearer abc"))), Ok("abc"));

        for bad in [
            "Bearer",
            "Bearer ",
            "Bearer  abc",
            "Bearer abc def",
            "bearer abc",
            "Basic abc",
            "abc",
            " Bearer abc",
        ] {
            assert_eq!(
                parse_bearer(Some(&header(bad))),
                Err(AuthError::MalformedHeader),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn parse_bearer_rejects_non_utf8() {
        let v = HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap();
        assert_eq!(parse_bearer(Some(&v)), Err(AuthError::MalformedHeader));
    }

    #[tokio::test]
    async fn malformed_headers_never_hit_the_store() {
        let store = Arc::new(CountingStore::default());
        let guard = guard_with(store.clone());

        assert_eq!(guard.authorize(None).await, Err(AuthError::MissingToken));
        for bad in ["Bearer ", "Token abc", "Bearer a b"] {
            assert_eq!(
                guard.authorize(Some(&header(bad))).await,
                Err(AuthError::MalformedHeader)
            );
        }
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let store = Arc::new(CountingStore::default());
        let guard = guard_with(store.clone());
        assert_eq!(
            guard.authorize(Some(&header("Bearer wrongtoken"))).await,
            Err(AuthError::InvalidToken)
        );
        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn valid_token_binds_owner() {
        let store = Arc::new(CountingStore::default());
        let now = OffsetDateTime::now_utc();
        let user_id = Uuid::new_v4();
        let token = Token::issue(user_id, TimeDuration::hours(24), now);
        store.insert(&token).await.unwrap();

        let guard = guard_with(store);
        let got = guard
            .authorize_at(Some(&header(&format!("Bearer {}", token.token))), now)
            .await;
        assert_eq!(got, Ok(user_id));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let store = Arc::new(CountingStore::default());
        let issued = OffsetDateTime::now_utc() - TimeDuration::hours(25);
        let token = Token::issue(Uuid::new_v4(), TimeDuration::hours(24), issued);
        store.insert(&token).await.unwrap();

        let guard = guard_with(store);
        let value = header(&format!("Bearer {}", token.token));
        assert_eq!(guard.authorize(Some(&value)).await, Err(AuthError::ExpiredToken));
        assert_eq!(
            guard.authorize_at(Some(&value), token.expires_at).await,
            Err(AuthError::ExpiredToken)
        );
        assert!(guard
            .authorize_at(Some(&value), token.expires_at - TimeDuration::seconds(1))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn store_failure_fails_closed() {
        let guard = Guard::new(Arc::new(FailingStore), Duration::from_secs(5));
        assert_eq!(
            guard.authorize(Some(&header("Bearer anything"))).await,
            Err(AuthError::InvalidToken)
        );
    }

    struct SlowStore;

    #[async_trait]
    impl TokenStore for SlowStore {
        async fn insert(&self, _token: &Token) -> Result<(), StoreError> {
            Ok(())
        }
        async fn find_by_value(&self, _value: &str) -> Result<Option<Token>, StoreError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(None)
        }
    }

    #[tokio::test]
    async fn slow_store_times_out_as_invalid() {
        let guard = Guard::new(Arc::new(SlowStore), Duration::from_millis(20));
        assert_eq!(
            guard.authorize(Some(&header("Bearer anything"))).await,
            Err(AuthError::InvalidToken)
        );
    }
}
