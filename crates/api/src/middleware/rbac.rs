//! Role-based access control (RBAC) extractors.
//!
//! The role used for authorization is read from `user_roles`, not from the
//! token: a token keeps its role until it expires, even after a demotion.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rolegate_core::error::CoreError;
use rolegate_core::roles::is_admin;
use rolegate_db::models::user_role::UserRoleWithRole;
use rolegate_db::repositories::UserRoleRepo;

use super::auth::VerifiedUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires a role at or above `admin`. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(admin: RequireAdmin) -> AppResult<Json<()>> {
///     tracing::info!(level = admin.level(), "admin request");
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin {
    pub user: VerifiedUser,
    /// The actor's current assignment.
    pub role: UserRoleWithRole,
}

impl RequireAdmin {
    pub fn level(&self) -> i32 {
        self.role.role_level
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = VerifiedUser::from_request_parts(parts, state).await?;
        let role = UserRoleRepo::find_for_user(&state.pool, user.auth.user_id)
            .await?
            .filter(|r| is_admin(r.role_level))
            .ok_or_else(|| AppError::Core(CoreError::Forbidden("Admin role required".into())))?;

        let token_level = user.auth.role_level();
        if token_level != role.role_level {
            tracing::debug!(
                user_id = %user.auth.user_id,
                token_role = ?user.auth.role.as_ref().map(|r| r.name.as_str()),
                token_level,
                role = %role.role_name,
                level = role.role_level,
                "Token role differs from assigned role"
            );
        }
        Ok(RequireAdmin { user, role })
    }
}
