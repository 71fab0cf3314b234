//! The seam between request handlers and the identity platform.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::IdentityError;
use crate::models::{Session, SignUpResult, TotpEnrollment, User, UserUpdate};

/// Operations the service delegates to the identity platform.
///
/// Calls taking an `access_token` act as that user; `admin_*` calls use the
/// service's own credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new account. `metadata` becomes the user's `user_metadata`.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<SignUpResult, IdentityError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, IdentityError>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;

    /// Email a recovery link that lands on `redirect_to`.
    async fn send_password_recovery(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityError>;

    async fn get_user(&self, access_token: &str) -> Result<User, IdentityError>;

    async fn update_user(
        &self,
        access_token: &str,
        update: &UserUpdate,
    ) -> Result<User, IdentityError>;

    /// Start TOTP enrollment. The factor stays unverified until a code is
    /// checked with [`challenge_and_verify`](Self::challenge_and_verify).
    async fn enroll_totp(&self, access_token: &str) -> Result<TotpEnrollment, IdentityError>;

    /// Open a challenge on `factor_id` and answer it with `code`.
    ///
    /// On success the returned session is at `aal2`.
    async fn challenge_and_verify(
        &self,
        access_token: &str,
        factor_id: &str,
        code: &str,
    ) -> Result<Session, IdentityError>;

    async fn unenroll_factor(&self, access_token: &str, factor_id: &str)
        -> Result<(), IdentityError>;

    async fn admin_get_user(&self, user_id: Uuid) -> Result<User, IdentityError>;

    /// Replace keys in the user's `app_metadata`.
    async fn admin_update_app_metadata(
        &self,
        user_id: Uuid,
        app_metadata: serde_json::Value,
    ) -> Result<User, IdentityError>;
}
