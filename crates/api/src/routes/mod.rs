pub mod admin;
pub mod auth;
pub mod health;
pub mod me;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/sign-up                        register (public)
/// /auth/login                          password sign-in (public)
/// /auth/mfa/verify                     TOTP step-up (aal1 session)
/// /auth/refresh                        refresh (public)
/// /auth/logout                         logout (requires auth)
/// /auth/forgot-password                send recovery email (public)
/// /auth/reset-password                 set password (recovery session)
///
/// /me                                  profile
/// /me/profile                          update names
/// /me/email                            request email change
/// /me/password                         change password
/// /me/mfa                              factor status
/// /me/mfa/enroll                       start TOTP enrollment
/// /me/mfa/verify                       finish TOTP enrollment
/// /me/mfa/{factor_id}                  remove factor
///
/// /admin/roles                         list roles (admin only)
/// /admin/users                         list users
/// /admin/users/{user_id}/role          assign role
/// /admin/audit                         role audit log
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/me", me::router())
        .nest("/admin", admin::router())
}
