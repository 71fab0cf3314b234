//! Handlers for the `/admin` console: roles, user listing, role assignment
//! and the role audit log.
//!
//! All handlers require an admin via [`RequireAdmin`]. The actor's level
//! always comes from the database.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use rolegate_core::audit::display_name;
use rolegate_core::error::CoreError;
use rolegate_core::pagination::{Page, AUDIT_PAGE_SIZE, USERS_PAGE_SIZE};
use rolegate_core::roles::{authorize_assignment, can_manage_user, RoleClaim, LEVEL_NONE};
use rolegate_core::types::{DbId, Timestamp};
use rolegate_db::models::role::Role;
use rolegate_db::models::user_role::{AssignOutcome, AssignRole};
use rolegate_db::repositories::{AuditRepo, RoleRepo, UserRoleRepo};
use rolegate_identity::models::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::PageParams;
use crate::response::DataResponse;
use crate::state::AppState;

const MSG_ROLE_ASSIGNED: &str = "Role assigned successfully";
const MSG_ROLE_UNCHANGED: &str = "No change in role";
const MSG_ROLE_STALE: &str = "The user's role was changed by someone else. Reload and try again";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `PUT /admin/users/{user_id}/role`.
#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role_id: Uuid,
    /// The role the caller last saw on the user. When the user's role has
    /// changed since, the request fails with 409.
    #[serde(default)]
    pub current_role_id: Option<Uuid>,
}

/// A role as listed for the admin console.
#[derive(Debug, Serialize)]
pub struct RoleEntry {
    pub id: Uuid,
    pub name: String,
    pub level: i32,
    pub description: Option<String>,
    /// Whether the caller may hand out this role.
    pub assignable: bool,
}

/// A user row in the admin user listing.
#[derive(Debug, Serialize)]
pub struct AdminUserEntry {
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub role: RoleSummary,
    /// `false` for peers of the caller, who are listed but read-only.
    pub manageable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleSummary {
    pub id: Option<Uuid>,
    pub name: String,
    pub level: i32,
}

#[derive(Debug, Serialize)]
pub struct AssignRoleResponse {
    pub message: &'static str,
    pub user_id: Uuid,
    pub role: RoleSummary,
    /// Id of the audit entry written, absent when nothing changed.
    pub audit_id: Option<DbId>,
}

/// Email and name of a user referenced by an audit entry.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuditLogEntry {
    pub id: DbId,
    pub action: String,
    pub changed_at: Timestamp,
    /// The user whose role changed.
    pub user: Option<UserSummary>,
    /// Who made the change; `null` for system changes such as sign-up.
    pub changed_by: Option<UserSummary>,
    pub old_role: Option<RoleSummary>,
    pub new_role: Option<RoleSummary>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/roles
///
/// All roles, lowest level first, each flagged with whether the caller may
/// assign it.
pub async fn list_roles(
    State(state): State<AppState>,
    admin: RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<RoleEntry>>>> {
    let actor_level = admin.level();
    let roles = RoleRepo::list(&state.pool)
        .await?
        .into_iter()
        .map(|r| RoleEntry {
            assignable: can_manage_user(actor_level, r.level),
            id: r.id,
            name: r.name,
            level: r.level,
            description: r.description,
        })
        .collect();
    Ok(Json(DataResponse { data: roles }))
}

/// GET /api/v1/admin/users?page=&page_size=
///
/// Users at or below the caller's level, highest first. Rows whose identity
/// lookup fails are dropped from the page but still counted in the totals.
pub async fn list_users(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Page<AdminUserEntry>>>> {
    let actor_level = admin.level();
    let request = params.to_request(USERS_PAGE_SIZE);
    let visible = UserRoleRepo::list_visible(&state.pool, actor_level).await?;
    let page = Page::from_vec(visible, request);

    let mut entries = Vec::with_capacity(page.items.len());
    for row in &page.items {
        let user = match state.identity.admin_get_user(row.user_id).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(
                    user_id = %row.user_id,
                    error = %e,
                    "Skipping user: identity lookup failed"
                );
                continue;
            }
        };
        let first_name = user.metadata_str("first_name");
        let last_name = user.metadata_str("last_name");
        entries.push(AdminUserEntry {
            id: user.id,
            display_name: display_name(user.metadata_str("display_name"), first_name, last_name),
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
            email: user.email.clone(),
            role: RoleSummary {
                id: Some(row.role_id),
                name: row.role_name.clone(),
                level: row.role_level,
            },
            manageable: can_manage_user(actor_level, row.role_level),
        });
    }

    Ok(Json(DataResponse {
        data: page.map(|_| entries),
    }))
}

/// PUT /api/v1/admin/users/{user_id}/role
///
/// Give a user a new role. The caller must outrank both the user's current
/// role (no role counts as level 0) and the new role. Re-assigning the
/// current role writes nothing.
pub async fn assign_role(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(user_id): Path<Uuid>,
    Json(input): Json<AssignRoleRequest>,
) -> AppResult<Json<DataResponse<AssignRoleResponse>>> {
    let actor_id = admin.user.auth.user_id;
    let actor_level = admin.level();

    let role = RoleRepo::find_by_id(&state.pool, input.role_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Role", input.role_id)))?;

    let current = UserRoleRepo::find_for_user(&state.pool, user_id).await?;
    let target_level = current.as_ref().map_or(LEVEL_NONE, |r| r.role_level);

    if let Err(e) = authorize_assignment(actor_level, target_level, role.level) {
        tracing::warn!(
            actor_id = %actor_id,
            %user_id,
            actor_level,
            target_level,
            new_level = role.level,
            "Role assignment rejected"
        );
        return Err(e.into());
    }

    let summary = role_summary(&role);
    let assignment = AssignRole {
        user_id,
        role_id: role.id,
        assigned_by: Some(actor_id),
        expected_role_id: input
            .current_role_id
            .or_else(|| current.as_ref().map(|r| r.role_id)),
    };
    let (message, audit_id) = match UserRoleRepo::assign(&state.pool, &assignment).await? {
        AssignOutcome::Assigned {
            action, audit_id, ..
        } => {
            tracing::info!(
                actor_id = %actor_id,
                %user_id,
                role = %role.name,
                %action,
                audit_id,
                "Role assigned"
            );
            sync_role_claim(&state, user_id, &role).await;
            (MSG_ROLE_ASSIGNED, Some(audit_id))
        }
        AssignOutcome::Unchanged(_) => (MSG_ROLE_UNCHANGED, None),
        AssignOutcome::Stale { current_role_id } => {
            tracing::warn!(
                actor_id = %actor_id,
                %user_id,
                current_role_id = ?current_role_id,
                "Role assignment lost a concurrent update"
            );
            return Err(AppError::Core(CoreError::Conflict(MSG_ROLE_STALE.into())));
        }
    };

    Ok(Json(DataResponse {
        data: AssignRoleResponse {
            message,
            user_id,
            role: summary,
            audit_id,
        },
    }))
}

/// GET /api/v1/admin/audit?page=&page_size=
///
/// Role changes, newest first, with the subject and actor resolved to
/// email and display name.
pub async fn audit_log(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Page<AuditLogEntry>>>> {
    let request = params.to_request(AUDIT_PAGE_SIZE);
    let total = AuditRepo::count(&state.pool).await?;
    let rows = AuditRepo::list_page(&state.pool, request.limit(), request.offset()).await?;

    // Each user is looked up once per page.
    let ids: Vec<Uuid> = rows
        .iter()
        .flat_map(|r| [r.user_id, r.changed_by])
        .flatten()
        .collect();
    let mut users: HashMap<Uuid, Option<User>> = HashMap::new();
    for id in ids {
        if users.contains_key(&id) {
            continue;
        }
        let user = match state.identity.admin_get_user(id).await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(user_id = %id, error = %e, "Audit log: identity lookup failed");
                None
            }
        };
        users.insert(id, user);
    }
    let summarize = |id: Option<Uuid>| {
        id.map(|id| user_summary(id, users.get(&id).and_then(Option::as_ref)))
    };

    let entries = rows
        .into_iter()
        .map(|row| AuditLogEntry {
            id: row.id,
            user: summarize(row.user_id),
            changed_by: summarize(row.changed_by),
            old_role: row
                .old_role_name
                .zip(row.old_role_level)
                .map(|(name, level)| RoleSummary { id: None, name, level }),
            new_role: row
                .new_role_name
                .zip(row.new_role_level)
                .map(|(name, level)| RoleSummary { id: None, name, level }),
            action: row.action,
            changed_at: row.changed_at,
        })
        .collect();

    Ok(Json(DataResponse {
        data: Page::new(entries, total, request),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn role_summary(role: &Role) -> RoleSummary {
    RoleSummary {
        id: Some(role.id),
        name: role.name.clone(),
        level: role.level,
    }
}

fn user_summary(id: Uuid, user: Option<&User>) -> UserSummary {
    UserSummary {
        id,
        email: user.and_then(|u| u.email.clone()),
        display_name: user.and_then(|u| {
            display_name(
                u.metadata_str("display_name"),
                u.metadata_str("first_name"),
                u.metadata_str("last_name"),
            )
        }),
    }
}

/// Mirror the new role into the user's `app_metadata` so fresh tokens
/// carry it. Failure only delays that; the database stays authoritative.
async fn sync_role_claim(state: &AppState, user_id: Uuid, role: &Role) {
    let claim = RoleClaim {
        name: role.name.clone(),
        level: role.level,
    };
    if let Err(e) = state
        .identity
        .admin_update_app_metadata(user_id, claim.to_app_metadata())
        .await
    {
        tracing::warn!(%user_id, error = %e, "Failed to sync role to identity platform");
    }
}
