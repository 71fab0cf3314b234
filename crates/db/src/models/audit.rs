//! Role audit trail models.
//!
//! Audit rows have no `updated_at`: the table rejects updates and deletes.

use rolegate_core::types::{DbId, Timestamp, Uuid};
use serde::Serialize;
use sqlx::FromRow;

/// An audit row joined with the subject's user id and both role rows.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditEntryDetail {
    pub id: DbId,
    pub action: String,
    pub user_id: Option<Uuid>,
    pub old_role_name: Option<String>,
    pub old_role_level: Option<i32>,
    pub new_role_name: Option<String>,
    pub new_role_level: Option<i32>,
    pub changed_by: Option<Uuid>,
    pub changed_at: Timestamp,
}
