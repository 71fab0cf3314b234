//! Route definitions for the admin console.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/roles", get(admin::list_roles))
        .route("/users", get(admin::list_users))
        .route("/users/{user_id}/role", put(admin::assign_role))
        .route("/audit", get(admin::audit_log))
}
