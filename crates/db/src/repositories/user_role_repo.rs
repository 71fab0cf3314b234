//! Repository for the `user_roles` table.

use rolegate_core::audit::AuditAction;
use rolegate_core::roles::can_view_user;
use rolegate_core::types::{DbId, Uuid};
use sqlx::{PgConnection, PgPool};

use crate::models::user_role::{AssignOutcome, AssignRole, UserRole, UserRoleWithRole};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, role_id, created_by, updated_by, created_at, updated_at";

/// Columns for `user_roles ur JOIN roles r`.
const JOINED_COLUMNS: &str = "ur.id, ur.user_id, ur.role_id, \
                              r.name AS role_name, r.level AS role_level, \
                              r.description AS role_description, \
                              ur.created_at, ur.updated_at";

/// Provides role assignment operations.
pub struct UserRoleRepo;

impl UserRoleRepo {
    /// The user's current role, if any.
    pub async fn find_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<UserRoleWithRole>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM user_roles ur \
             JOIN roles r ON r.id = ur.role_id \
             WHERE ur.user_id = $1"
        );
        sqlx::query_as::<_, UserRoleWithRole>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// All assignments an actor at `actor_level` may see (see
    /// [`can_view_user`]), highest level first, then oldest first.
    pub async fn list_visible(
        pool: &PgPool,
        actor_level: i32,
    ) -> Result<Vec<UserRoleWithRole>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM user_roles ur \
             JOIN roles r ON r.id = ur.role_id \
             ORDER BY r.level DESC, ur.created_at ASC, ur.id ASC"
        );
        let rows = sqlx::query_as::<_, UserRoleWithRole>(&query)
            .fetch_all(pool)
            .await?;
        Ok(rows
            .into_iter()
            .filter(|r| can_view_user(actor_level, r.role_level))
            .collect())
    }

    /// Give a user a role and append the matching audit entry.
    ///
    /// The current row is locked for the duration of the transaction. If it
    /// no longer matches `input.expected_role_id`, nothing is written and
    /// [`AssignOutcome::Stale`] is returned.
    pub async fn assign(pool: &PgPool, input: &AssignRole) -> Result<AssignOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let lock_query = format!("SELECT {COLUMNS} FROM user_roles WHERE user_id = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, UserRole>(&lock_query)
            .bind(input.user_id)
            .fetch_optional(&mut *tx)
            .await?;

        let current_role_id = current.as_ref().map(|row| row.role_id);
        if current_role_id != input.expected_role_id {
            return Ok(AssignOutcome::Stale { current_role_id });
        }

        let (user_role, action) = match current {
            Some(row) if row.role_id == input.role_id => {
                return Ok(AssignOutcome::Unchanged(row));
            }
            Some(row) => {
                let query = format!(
                    "UPDATE user_roles SET role_id = $2, updated_by = $3, updated_at = NOW() \
                     WHERE id = $1 \
                     RETURNING {COLUMNS}"
                );
                let updated = sqlx::query_as::<_, UserRole>(&query)
                    .bind(row.id)
                    .bind(input.role_id)
                    .bind(input.assigned_by)
                    .fetch_one(&mut *tx)
                    .await?;
                (updated, AuditAction::Update)
            }
            None => {
                // A concurrent insert for the same user wins; report it as stale.
                let query = format!(
                    "INSERT INTO user_roles (user_id, role_id, created_by, updated_by) \
                     VALUES ($1, $2, $3, $3) \
                     ON CONFLICT (user_id) DO NOTHING \
                     RETURNING {COLUMNS}"
                );
                let inserted = sqlx::query_as::<_, UserRole>(&query)
                    .bind(input.user_id)
                    .bind(input.role_id)
                    .bind(input.assigned_by)
                    .fetch_optional(&mut *tx)
                    .await?;
                match inserted {
                    Some(row) => (row, AuditAction::Insert),
                    None => {
                        tx.rollback().await?;
                        let current_role_id = Self::current_role_id(pool, input.user_id).await?;
                        return Ok(AssignOutcome::Stale { current_role_id });
                    }
                }
            }
        };

        let audit_id = Self::append_audit(
            &mut *tx,
            action,
            &user_role,
            current_role_id,
            input.assigned_by,
        )
        .await?;

        tx.commit().await?;
        Ok(AssignOutcome::Assigned {
            user_role,
            action,
            old_role_id: current_role_id,
            audit_id,
        })
    }

    async fn current_role_id(pool: &PgPool, user_id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>("SELECT role_id FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    async fn append_audit(
        conn: &mut PgConnection,
        action: AuditAction,
        user_role: &UserRole,
        old_role_id: Option<Uuid>,
        changed_by: Option<Uuid>,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO user_roles_audit \
                (action, user_role_id, role_id_old, role_id_new, changed_by) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(action.as_str())
        .bind(user_role.id)
        .bind(old_role_id)
        .bind(user_role.role_id)
        .bind(changed_by)
        .fetch_one(&mut *conn)
        .await
    }
}
