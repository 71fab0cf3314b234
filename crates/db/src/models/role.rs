//! Role entity model.

use rolegate_core::types::{Timestamp, Uuid};
use serde::Serialize;
use sqlx::FromRow;

/// A role row from the `roles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub level: i32,
    pub description: Option<String>,
    pub created_at: Timestamp,
}
