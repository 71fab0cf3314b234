//! Validation of identity platform access tokens.
//!
//! Access tokens are HS256-signed JWTs carrying a [`Claims`] payload. The
//! platform signs them with a secret shared with this service.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use rolegate_core::roles::RoleClaim;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audience the platform stamps on tokens of signed-in users.
pub const DEFAULT_AUDIENCE: &str = "authenticated";

/// Authenticator assurance level of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aal {
    /// Password (or other single factor) only.
    Aal1,
    /// A second factor was verified in this session.
    Aal2,
}

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the user's id on the identity platform.
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
    #[serde(default = "default_aal")]
    pub aal: Aal,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub app_metadata: serde_json::Value,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

fn default_aal() -> Aal {
    Aal::Aal1
}

impl Claims {
    /// The role mirrored into `app_metadata`, if any.
    pub fn role(&self) -> Option<RoleClaim> {
        RoleClaim::from_app_metadata(&self.app_metadata)
    }
}

/// Configuration for access-token validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret shared with the identity platform.
    pub secret: String,
    /// Required `aud` claim.
    pub audience: String,
}

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                 | Required | Default         |
    /// |-------------------------|----------|-----------------|
    /// | `IDENTITY_JWT_SECRET`   | **yes**  | --              |
    /// | `IDENTITY_JWT_AUDIENCE` | no       | `authenticated` |
    ///
    /// # Panics
    ///
    /// Panics if `IDENTITY_JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret = std::env::var("IDENTITY_JWT_SECRET")
            .expect("IDENTITY_JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "IDENTITY_JWT_SECRET must not be empty");

        let audience =
            std::env::var("IDENTITY_JWT_AUDIENCE").unwrap_or_else(|_| DEFAULT_AUDIENCE.into());

        Self { secret, audience }
    }
}

/// Validate and decode an access token, returning the embedded [`Claims`].
///
/// Checks the signature, expiry and audience.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.audience.as_str()]);
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}
