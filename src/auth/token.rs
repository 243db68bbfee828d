use rand::{
    distributions::{Alphanumeric, DistString},
    rngs::OsRng,
};
use serde::Serialize;
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Length of the opaque token value handed to clients.
pub const TOKEN_LEN: usize = 48;

/// Session token row. Created once at login and never updated.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Token {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Token {
    /// Builds a fresh token for `user_id` valid for `ttl` from `now`.
    pub fn issue(user_id: Uuid, ttl: Duration, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token: generate_value(),
            expires_at: now + ttl,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

/// Random alphanumeric value drawn from the OS CSPRNG (~285 bits).
pub fn generate_value() -> String {
    Alphanumeric.sample_string(&mut OsRng, TOKEN_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_binds_user_and_ttl() {
        let now = OffsetDateTime::now_utc();
        let user_id = Uuid::new_v4();
        let t = Token::issue(user_id, Duration::hours(24), now);
        assert_eq!(t.user_id, user_id);
        assert_eq!(t.expires_at - t.created_at, Duration::hours(24));
        assert_eq!(t.token.len(), TOKEN_LEN);
        assert!(t.token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let now = OffsetDateTime::now_utc();
        let t = Token::issue(Uuid::new_v4(), Duration::minutes(5), now);
        assert!(!t.is_expired_at(now));
        assert!(!t.is_expired_at(now + Duration::minutes(4)));
        assert!(t.is_expired_at(now + Duration::minutes(5)));
        assert!(t.is_expired_at(now + Duration::hours(1)));
    }

    #[test]
    fn values_do_not_repeat() {
        let a = generate_value();
        let b = generate_value();
        assert_ne!(a, b);
    }
}
