//! Handlers for the caller's own account (`/me`): profile, email,
//! password and TOTP factors.
//!
//! Every handler takes a [`VerifiedUser`], so users with MFA enrolled must
//! be on an `aal2` session.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rolegate_core::audit::display_name;
use rolegate_core::error::CoreError;
use rolegate_core::roles::role_description;
use rolegate_core::validation::{
    check, TwoFactorInput, UpdateEmailInput, UpdatePasswordInput, UpdateProfileInput,
};
use rolegate_db::repositories::UserRoleRepo;
use rolegate_identity::models::{Factor, Session, UserUpdate};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::auth::ensure_default_role;
use crate::middleware::auth::VerifiedUser;
use crate::response::{DataResponse, MessageResponse};
use crate::state::AppState;

const MSG_PROFILE_UPDATED: &str = "Profile updated successfully";
const MSG_EMAIL_CHANGE: &str =
    "Check your email for verification link (both old and new email addresses)";
const MSG_PASSWORD_UPDATED: &str = "Password updated successfully";
const MSG_WRONG_PASSWORD: &str = "Current password is incorrect";
const MSG_MFA_ENABLED: &str = "Two-factor authentication enabled successfully";

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<RoleInfo>,
    pub mfa_enabled: bool,
}

/// The caller's role with a plain-language summary of what it allows.
#[derive(Debug, Serialize)]
pub struct RoleInfo {
    pub name: String,
    pub level: i32,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MfaStatusResponse {
    /// Whether any TOTP factor is verified.
    pub enrolled: bool,
    pub factors: Vec<Factor>,
}

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub factor_id: String,
    pub qr_code: String,
    pub secret: String,
    pub uri: String,
}

#[derive(Debug, Serialize)]
pub struct MfaVerifiedResponse {
    pub message: &'static str,
    /// The upgraded `aal2` session.
    pub session: Session,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/me
///
/// Accounts that never received the default role get it here.
pub async fn get_profile(
    State(state): State<AppState>,
    me: VerifiedUser,
) -> AppResult<Json<DataResponse<ProfileResponse>>> {
    let mut role = UserRoleRepo::find_for_user(&state.pool, me.auth.user_id).await?;
    if role.is_none() {
        ensure_default_role(&state, me.auth.user_id).await?;
        role = UserRoleRepo::find_for_user(&state.pool, me.auth.user_id).await?;
    }
    let role = role.map(|r| RoleInfo {
        description: role_description(r.role_level),
        name: r.role_name,
        level: r.role_level,
    });

    let user = &me.user;
    let first_name = user.metadata_str("first_name");
    let last_name = user.metadata_str("last_name");
    let profile = ProfileResponse {
        id: user.id,
        email: user.email.clone(),
        first_name: first_name.map(str::to_string),
        last_name: last_name.map(str::to_string),
        display_name: display_name(user.metadata_str("display_name"), first_name, last_name),
        role,
        mfa_enabled: user.verified_totp().is_some(),
    };
    Ok(Json(DataResponse { data: profile }))
}

/// PUT /api/v1/me/profile
pub async fn update_profile(
    State(state): State<AppState>,
    me: VerifiedUser,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    check(&input)?;

    let update = UserUpdate {
        data: Some(serde_json::json!({
            "first_name": input.first_name,
            "last_name": input.last_name,
        })),
        ..Default::default()
    };
    state
        .identity
        .update_user(&me.auth.access_token, &update)
        .await?;

    Ok(Json(DataResponse::message(MSG_PROFILE_UPDATED)))
}

/// PUT /api/v1/me/email
///
/// The platform emails a confirmation link to both the old and new address;
/// the change applies once both are confirmed.
pub async fn update_email(
    State(state): State<AppState>,
    me: VerifiedUser,
    Json(input): Json<UpdateEmailInput>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    check(&input)?;

    let update = UserUpdate {
        email: Some(input.email),
        ..Default::default()
    };
    state
        .identity
        .update_user(&me.auth.access_token, &update)
        .await?;

    tracing::info!(user_id = %me.auth.user_id, "Email change requested");
    Ok(Json(DataResponse::message(MSG_EMAIL_CHANGE)))
}

/// PUT /api/v1/me/password
///
/// Re-checks the current password with a fresh sign-in before changing it.
pub async fn update_password(
    State(state): State<AppState>,
    me: VerifiedUser,
    Json(input): Json<UpdatePasswordInput>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    check(&input)?;

    let email = me
        .user
        .email
        .as_deref()
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", me.auth.user_id)))?;

    match state
        .identity
        .sign_in_with_password(email, &input.current_password)
        .await
    {
        Ok(_) => {}
        // Rejected grant; platform outages still surface as 502.
        Err(e) if e.status().is_some_and(|status| status < 500) => {
            return Err(AppError::Core(CoreError::Unauthorized(
                MSG_WRONG_PASSWORD.into(),
            )));
        }
        Err(e) => return Err(e.into()),
    }

    let update = UserUpdate {
        password: Some(input.new_password),
        ..Default::default()
    };
    state
        .identity
        .update_user(&me.auth.access_token, &update)
        .await?;

    tracing::info!(user_id = %me.auth.user_id, "Password changed");
    Ok(Json(DataResponse::message(MSG_PASSWORD_UPDATED)))
}

/// GET /api/v1/me/mfa
pub async fn mfa_status(me: VerifiedUser) -> AppResult<Json<DataResponse<MfaStatusResponse>>> {
    let enrolled = me.user.verified_totp().is_some();
    Ok(Json(DataResponse {
        data: MfaStatusResponse {
            enrolled,
            factors: me.user.factors,
        },
    }))
}

/// POST /api/v1/me/mfa/enroll
///
/// Start TOTP enrollment. The factor stays unverified until a code is posted
/// to `/me/mfa/verify`.
pub async fn enroll_mfa(
    State(state): State<AppState>,
    me: VerifiedUser,
) -> AppResult<Json<DataResponse<EnrollResponse>>> {
    let enrollment = state.identity.enroll_totp(&me.auth.access_token).await?;
    Ok(Json(DataResponse {
        data: EnrollResponse {
            factor_id: enrollment.id,
            qr_code: enrollment.totp.qr_code,
            secret: enrollment.totp.secret,
            uri: enrollment.totp.uri,
        },
    }))
}

/// POST /api/v1/me/mfa/verify
pub async fn verify_mfa_enrollment(
    State(state): State<AppState>,
    me: VerifiedUser,
    Json(input): Json<TwoFactorInput>,
) -> AppResult<Json<DataResponse<MfaVerifiedResponse>>> {
    check(&input)?;

    let session = state
        .identity
        .challenge_and_verify(&me.auth.access_token, &input.factor_id, &input.code)
        .await?;

    tracing::info!(user_id = %me.auth.user_id, factor_id = %input.factor_id, "TOTP factor enabled");
    Ok(Json(DataResponse {
        data: MfaVerifiedResponse {
            message: MSG_MFA_ENABLED,
            session,
        },
    }))
}

/// DELETE /api/v1/me/mfa/{factor_id}
pub async fn unenroll_mfa(
    State(state): State<AppState>,
    me: VerifiedUser,
    Path(factor_id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .identity
        .unenroll_factor(&me.auth.access_token, &factor_id)
        .await?;

    tracing::info!(user_id = %me.auth.user_id, %factor_id, "TOTP factor removed");
    Ok(StatusCode::NO_CONTENT)
}
