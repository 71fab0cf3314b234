//! Repository for the `user_roles_audit` table.
//!
//! Rows are written by [`UserRoleRepo::assign`](super::UserRoleRepo::assign)
//! inside the assignment transaction; this repository only reads.

use sqlx::PgPool;

use crate::models::audit::AuditEntryDetail;

/// Provides read operations for the role audit trail.
pub struct AuditRepo;

impl AuditRepo {
    /// Total number of audit entries.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_roles_audit")
            .fetch_one(pool)
            .await
    }

    /// One page of audit entries, newest first.
    ///
    /// Entries sharing a `changed_at` are ordered by id so pages never overlap.
    pub async fn list_page(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEntryDetail>, sqlx::Error> {
        sqlx::query_as::<_, AuditEntryDetail>(
            "SELECT a.id, a.action, ur.user_id, \
                    old_r.name AS old_role_name, old_r.level AS old_role_level, \
                    new_r.name AS new_role_name, new_r.level AS new_role_level, \
                    a.changed_by, a.changed_at \
             FROM user_roles_audit a \
             LEFT JOIN user_roles ur ON ur.id = a.user_role_id \
             LEFT JOIN roles old_r ON old_r.id = a.role_id_old \
             LEFT JOIN roles new_r ON new_r.id = a.role_id_new \
             ORDER BY a.changed_at DESC, a.id DESC \
             LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}
