//! Authentication extractors for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rolegate_core::error::CoreError;
use rolegate_core::roles::{RoleClaim, LEVEL_NONE};
use rolegate_identity::models::User;
use uuid::Uuid;

use crate::auth::jwt::{validate_token, Aal};
use crate::error::AppError;
use crate::state::AppState;

/// Rejection message for single-factor sessions of users who enrolled MFA.
pub const MSG_MFA_REQUIRED: &str = "Two-factor verification required";

/// User authenticated by a platform-issued Bearer token.
///
/// Any valid token is accepted, including `aal1` sessions of users with a
/// second factor. Use [`VerifiedUser`] where the session must be complete.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub aal: Aal,
    /// Role as of token issue; may lag behind the database.
    pub role: Option<RoleClaim>,
    /// The raw token, for calls made to the platform on the user's behalf.
    pub access_token: String,
}

impl AuthUser {
    /// The token's role level, or `0` when the token carries no role.
    pub fn role_level(&self) -> i32 {
        self.role.as_ref().map_or(LEVEL_NONE, |r| r.level)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        let role = claims.role();
        Ok(AuthUser {
            user_id: claims.sub,
            aal: claims.aal,
            role,
            access_token: token.to_string(),
        })
    }
}

/// Authenticated user whose session satisfies their MFA enrollment.
///
/// Loads the platform user record; if it has a verified TOTP factor the
/// session must be at `aal2`, otherwise the request is rejected with 403.
pub struct VerifiedUser {
    pub auth: AuthUser,
    /// The user's current record on the platform.
    pub user: User,
}

impl FromRequestParts<AppState> for VerifiedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let user = state.identity.get_user(&auth.access_token).await?;

        if user.verified_totp().is_some() && auth.aal != Aal::Aal2 {
            return Err(AppError::Core(CoreError::Forbidden(MSG_MFA_REQUIRED.into())));
        }
        Ok(VerifiedUser { auth, user })
    }
}
