//! Handlers for the public `/auth` flows: sign-up, login, MFA step-up,
//! session refresh, logout and password recovery.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rolegate_core::error::CoreError;
use rolegate_core::roles::DEFAULT_ROLE;
use rolegate_core::validation::{
    check, ForgotPasswordInput, LoginInput, ResetPasswordInput, SignUpInput, TwoFactorInput,
};
use rolegate_db::models::user_role::{AssignOutcome, AssignRole};
use rolegate_db::repositories::{RoleRepo, UserRoleRepo};
use rolegate_identity::models::{Session, SignUpResult, UserUpdate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt::{validate_token, Aal};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, MessageResponse};
use crate::state::AppState;

const MSG_SIGN_UP_CONFIRM: &str = "Check your email to confirm your account";
const MSG_RESET_SENT: &str =
    "If an account exists for that email, a password reset link has been sent";
const MSG_PASSWORD_UPDATED: &str = "Password updated successfully";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response for `POST /auth/sign-up`.
#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub user_id: Uuid,
    pub email: Option<String>,
    /// `true` when the account must be confirmed by email before login.
    pub confirmation_required: bool,
    pub session: Option<Session>,
    pub message: &'static str,
}

/// Response for `POST /auth/login`.
///
/// When `mfa_required` is set the session is only `aal1`; the client must
/// post a code for `factor_id` to `/auth/mfa/verify` using it.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub mfa_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factor_id: Option<String>,
    pub session: Session,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/sign-up
///
/// Register with the identity platform and give the new account the
/// default role. The audit entry records no actor. A failed role write does
/// not fail the request; [`ensure_default_role`] repeats it at login.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(input): Json<SignUpInput>,
) -> AppResult<(StatusCode, Json<DataResponse<SignUpResponse>>)> {
    check(&input)?;

    let metadata = serde_json::json!({
        "first_name": input.first_name,
        "last_name": input.last_name,
    });
    let result = state
        .identity
        .sign_up(&input.email, &input.password, metadata)
        .await?;
    let user = result.user().clone();

    if user.is_placeholder() {
        // Repeated sign-up; the platform hides whether the email is taken.
        tracing::debug!("Sign-up returned a placeholder user; no role assigned");
    } else if let Err(e) = ensure_default_role(&state, user.id).await {
        // The account exists either way; the role is filled in at login.
        tracing::error!(user_id = %user.id, error = %e, "Default role assignment failed");
    }

    let (confirmation_required, session) = match result {
        SignUpResult::Session(session) => (false, Some(session)),
        SignUpResult::Pending(_) => (true, None),
    };

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SignUpResponse {
                user_id: user.id,
                email: user.email,
                confirmation_required,
                session,
                message: MSG_SIGN_UP_CONFIRM,
            },
        }),
    ))
}

/// POST /api/v1/auth/login
///
/// Password sign-in. Users with a verified TOTP factor get an `aal1`
/// session and must complete `/auth/mfa/verify`.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<DataResponse<LoginResponse>>> {
    check(&input)?;

    let session = state
        .identity
        .sign_in_with_password(&input.email, &input.password)
        .await?;

    if let Err(e) = ensure_default_role(&state, session.user.id).await {
        tracing::warn!(user_id = %session.user.id, error = %e, "Default role backfill failed");
    }

    let aal = session_aal(&state, &session)?;
    let factor_id = match (aal, session.user.verified_totp()) {
        (Aal::Aal1, Some(factor)) => Some(factor.id.clone()),
        _ => None,
    };

    tracing::info!(user_id = %session.user.id, mfa_required = factor_id.is_some(), "User signed in");

    Ok(Json(DataResponse {
        data: LoginResponse {
            mfa_required: factor_id.is_some(),
            factor_id,
            session,
        },
    }))
}

/// POST /api/v1/auth/mfa/verify
///
/// Second login step: answer a TOTP challenge with the `aal1` session and
/// return the upgraded session.
pub async fn verify_mfa(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<TwoFactorInput>,
) -> AppResult<Json<DataResponse<Session>>> {
    check(&input)?;

    let session = state
        .identity
        .challenge_and_verify(&auth.access_token, &input.factor_id, &input.code)
        .await?;

    tracing::info!(user_id = %auth.user_id, "MFA verified");
    Ok(Json(DataResponse { data: session }))
}

/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<DataResponse<Session>>> {
    if input.refresh_token.trim().is_empty() {
        return Err(AppError::BadRequest("refresh_token is required".into()));
    }
    let session = state.identity.refresh_session(&input.refresh_token).await?;
    Ok(Json(DataResponse { data: session }))
}

/// POST /api/v1/auth/logout
///
/// Revoke the caller's session on the platform.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> AppResult<StatusCode> {
    state.identity.sign_out(&auth.access_token).await?;
    tracing::info!(user_id = %auth.user_id, "User signed out");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/forgot-password
///
/// Always answers 202 for a well-formed email so the endpoint does not
/// reveal which addresses have accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(input): Json<ForgotPasswordInput>,
) -> AppResult<(StatusCode, Json<DataResponse<MessageResponse>>)> {
    check(&input)?;

    let redirect_to = state.config.password_reset_redirect();
    if let Err(e) = state
        .identity
        .send_password_recovery(&input.email, &redirect_to)
        .await
    {
        tracing::warn!(error = %e, "Password recovery email failed");
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse::message(MSG_RESET_SENT)),
    ))
}

/// POST /api/v1/auth/reset-password
///
/// Set a new password using the recovery session from the emailed link.
pub async fn reset_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<ResetPasswordInput>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    check(&input)?;

    let update = UserUpdate {
        password: Some(input.password),
        ..Default::default()
    };
    state
        .identity
        .update_user(&auth.access_token, &update)
        .await?;

    tracing::info!(user_id = %auth.user_id, "Password reset");
    Ok(Json(DataResponse::message(MSG_PASSWORD_UPDATED)))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Give `user_id` the default role unless it already holds a role.
///
/// Safe to repeat and to race: a concurrent writer wins and nothing is
/// overwritten. The audit entry records no actor.
pub(crate) async fn ensure_default_role(state: &AppState, user_id: Uuid) -> AppResult<()> {
    if UserRoleRepo::find_for_user(&state.pool, user_id)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let role = RoleRepo::find_by_name(&state.pool, DEFAULT_ROLE)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Internal(format!(
                "default role '{DEFAULT_ROLE}' is not seeded"
            )))
        })?;

    let assignment = AssignRole {
        user_id,
        role_id: role.id,
        assigned_by: None,
        expected_role_id: None,
    };
    match UserRoleRepo::assign(&state.pool, &assignment).await? {
        AssignOutcome::Assigned { audit_id, .. } => {
            tracing::info!(%user_id, audit_id, role = DEFAULT_ROLE, "Default role assigned");
        }
        AssignOutcome::Unchanged(_) | AssignOutcome::Stale { .. } => {
            tracing::debug!(%user_id, "Role assigned concurrently; default not applied");
        }
    }
    Ok(())
}

/// Assurance level of a session the platform just issued.
fn session_aal(state: &AppState, session: &Session) -> AppResult<Aal> {
    validate_token(&session.access_token, &state.config.jwt)
        .map(|claims| claims.aal)
        .map_err(|e| {
            AppError::InternalError(format!("Identity platform issued an unverifiable token: {e}"))
        })
}
