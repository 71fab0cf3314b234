//! Route definitions for the caller's own account.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::me;
use crate::state::AppState;

/// Routes mounted at `/me`.
///
/// ```text
/// GET    /                  -> get_profile
/// PUT    /profile           -> update_profile
/// PUT    /email             -> update_email
/// PUT    /password          -> update_password
/// GET    /mfa               -> mfa_status
/// POST   /mfa/enroll        -> enroll_mfa
/// POST   /mfa/verify        -> verify_mfa_enrollment
/// DELETE /mfa/{factor_id}   -> unenroll_mfa
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(me::get_profile))
        .route("/profile", put(me::update_profile))
        .route("/email", put(me::update_email))
        .route("/password", put(me::update_password))
        .route("/mfa", get(me::mfa_status))
        .route("/mfa/enroll", post(me::enroll_mfa))
        .route("/mfa/verify", post(me::verify_mfa_enrollment))
        .route("/mfa/{factor_id}", delete(me::unenroll_mfa))
}
