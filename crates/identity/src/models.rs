//! Wire types for the identity platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Factor type string for time-based one-time passwords.
pub const FACTOR_TYPE_TOTP: &str = "totp";

/// Factor status once the user has proven possession of the secret.
pub const FACTOR_STATUS_VERIFIED: &str = "verified";

/// A user as returned by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    /// Profile data the user may edit (`first_name`, `last_name`, ...).
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    /// Data only the service can write (`role`, `role_level`).
    #[serde(default)]
    pub app_metadata: serde_json::Value,
    #[serde(default)]
    pub factors: Vec<Factor>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
    /// Linked sign-in identities. Absent on some admin responses.
    #[serde(default)]
    pub identities: Option<Vec<serde_json::Value>>,
}

impl User {
    /// A string field from `user_metadata`.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata.get(key).and_then(|v| v.as_str())
    }

    /// Whether this is the stand-in user GoTrue returns for a repeated
    /// sign-up when email confirmation is on. It has a fresh id that matches
    /// no account, and an empty `identities` list.
    pub fn is_placeholder(&self) -> bool {
        self.identities.as_ref().is_some_and(Vec::is_empty)
    }

    /// The first verified TOTP factor, if the user has completed enrollment.
    pub fn verified_totp(&self) -> Option<&Factor> {
        self.factors.iter().find(|f| f.is_verified_totp())
    }
}

/// An MFA factor attached to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factor {
    pub id: String,
    pub factor_type: String,
    pub status: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Factor {
    pub fn is_verified_totp(&self) -> bool {
        self.factor_type == FACTOR_TYPE_TOTP && self.status == FACTOR_STATUS_VERIFIED
    }
}

/// Tokens issued by the platform after a successful grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub refresh_token: String,
    pub user: User,
}

/// Result of a sign-up.
///
/// When email confirmation is enabled the platform returns only the user;
/// otherwise it signs the user in immediately.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResult {
    Session(Session),
    Pending(User),
}

impl SignUpResult {
    pub fn user(&self) -> &User {
        match self {
            SignUpResult::Session(session) => &session.user,
            SignUpResult::Pending(user) => user,
        }
    }
}

/// Fields a user may change on their own account. Unset fields are omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Merged into `user_metadata`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A freshly enrolled, not yet verified TOTP factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotpEnrollment {
    pub id: String,
    #[serde(rename = "type")]
    pub factor_type: String,
    pub totp: TotpSecret,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotpSecret {
    /// SVG data URI of the provisioning QR code.
    pub qr_code: String,
    pub secret: String,
    pub uri: String,
}

/// A pending MFA challenge.
#[derive(Debug, Clone, Deserialize)]
pub struct Challenge {
    pub id: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
}
