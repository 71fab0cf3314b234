//! Role hierarchy and the authorization rules built on it.
//!
//! Roles are totally ordered by an integer level. Names and levels must match
//! the seed data in `20250101000001_create_roles.sql`.

use serde::Serialize;

use crate::error::CoreError;

pub const ROLE_USER: &str = "user";
pub const ROLE_MODERATOR: &str = "moderator";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SUPER_ADMIN: &str = "super_admin";

pub const LEVEL_USER: i32 = 1;
pub const LEVEL_MODERATOR: i32 = 2;
pub const LEVEL_ADMIN: i32 = 3;
pub const LEVEL_SUPER_ADMIN: i32 = 4;

/// Level of a user who holds no role at all.
pub const LEVEL_NONE: i32 = 0;

/// Role given to every account created through sign-up.
pub const DEFAULT_ROLE: &str = ROLE_USER;

/// Rejection message when the target already sits at or above the actor.
pub const MSG_TARGET_TOO_HIGH: &str = "You cannot manage users with equal or higher role levels";

/// Rejection message when the requested role sits at or above the actor.
pub const MSG_ROLE_TOO_HIGH: &str = "You cannot assign roles equal to or higher than your own";

/// Name and level of a role as carried in a session's `app_metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleClaim {
    pub name: String,
    pub level: i32,
}

impl RoleClaim {
    /// Read `role` and `role_level` out of an `app_metadata` object.
    ///
    /// Both keys must be present; a level of zero (or below) counts as absent.
    pub fn from_app_metadata(app_metadata: &serde_json::Value) -> Option<Self> {
        let name = app_metadata.get("role")?.as_str()?;
        let level = app_metadata.get("role_level")?.as_i64()?;
        if name.is_empty() || level <= i64::from(LEVEL_NONE) {
            return None;
        }
        let level = i32::try_from(level).ok()?;
        Some(Self {
            name: name.to_string(),
            level,
        })
    }

    /// The `app_metadata` fragment that mirrors this claim on the platform.
    pub fn to_app_metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "role": self.name,
            "role_level": self.level,
        })
    }
}

/// An actor may manage a target only when it strictly outranks it.
pub fn can_manage_user(actor_level: i32, target_level: i32) -> bool {
    actor_level > target_level
}

/// Admin listings include peers (who cannot be modified) but never superiors.
pub fn can_view_user(actor_level: i32, target_level: i32) -> bool {
    target_level <= actor_level
}

/// Whether a level grants access to the admin console.
pub fn is_admin(level: i32) -> bool {
    level >= LEVEL_ADMIN
}

/// Check that `actor_level` may move a user currently at `target_level` to a
/// role at `new_level`.
///
/// The target is checked before the role, so a request failing both reports
/// the target.
pub fn authorize_assignment(
    actor_level: i32,
    target_level: i32,
    new_level: i32,
) -> Result<(), CoreError> {
    if !can_manage_user(actor_level, target_level) {
        return Err(CoreError::Forbidden(MSG_TARGET_TOO_HIGH.into()));
    }
    if !can_manage_user(actor_level, new_level) {
        return Err(CoreError::Forbidden(MSG_ROLE_TOO_HIGH.into()));
    }
    Ok(())
}

/// Human-readable summary of what a level allows.
pub fn role_description(level: i32) -> &'static str {
    match level {
        LEVEL_USER => "Standard access to your own account and settings.",
        LEVEL_MODERATOR => "Can manage standard users.",
        LEVEL_ADMIN => "Access to the admin console. Can manage users and moderators.",
        LEVEL_SUPER_ADMIN => "Full control over the application, including administrators.",
        _ => "No description available",
    }
}
