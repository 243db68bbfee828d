use crate::state::AppState;
use axum::Router;

pub mod authenticator;
mod dto;
pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod password;
pub mod token;

pub use authenticator::Authenticator;
pub use extractors::{AuthUser, RequestContext};
pub use guard::{require_auth, Guard};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
