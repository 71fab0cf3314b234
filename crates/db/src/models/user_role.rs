//! Role assignment models and DTOs.

use rolegate_core::audit::AuditAction;
use rolegate_core::types::{DbId, Timestamp, Uuid};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `user_roles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A `user_roles` row joined with its role.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserRoleWithRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub role_name: String,
    pub role_level: i32,
    pub role_description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for assigning a role.
#[derive(Debug, Clone)]
pub struct AssignRole {
    pub user_id: Uuid,
    pub role_id: Uuid,
    /// Who made the change; `None` for system assignments (e.g. sign-up).
    pub assigned_by: Option<Uuid>,
    /// The role the caller saw before deciding. The write only happens if the
    /// user still holds exactly this role (`None` = no role).
    pub expected_role_id: Option<Uuid>,
}

/// Result of [`UserRoleRepo::assign`](crate::repositories::UserRoleRepo::assign).
#[derive(Debug, Clone)]
pub enum AssignOutcome {
    /// The role was written and an audit entry appended.
    Assigned {
        user_role: UserRole,
        action: AuditAction,
        old_role_id: Option<Uuid>,
        audit_id: DbId,
    },
    /// The user already holds the requested role; nothing was written.
    Unchanged(UserRole),
    /// The user's role changed since the caller read it.
    Stale { current_role_id: Option<Uuid> },
}
