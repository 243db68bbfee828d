pub mod handlers;
pub mod model;

use crate::state::AppState;
use axum::Router;

/// Protected user routes; the caller layers the guard on top.
pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
