//! Role-change audit vocabulary.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Kind of change recorded in the role audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    /// The user had no role before.
    Insert,
    /// The user's existing role was replaced.
    Update,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Insert => "INSERT",
            AuditAction::Update => "UPDATE",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INSERT" => Ok(AuditAction::Insert),
            "UPDATE" => Ok(AuditAction::Update),
            other => Err(CoreError::Internal(format!("unknown audit action '{other}'"))),
        }
    }
}

/// Pick the name to show for a user from their profile metadata.
///
/// An explicit `display_name` wins; otherwise first and last name are joined.
/// Returns `None` when nothing usable is set.
pub fn display_name(
    display_name: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Option<String> {
    if let Some(name) = display_name.map(str::trim).filter(|n| !n.is_empty()) {
        return Some(name.to_string());
    }
    let joined = format!(
        "{} {}",
        first_name.unwrap_or_default(),
        last_name.unwrap_or_default()
    );
    let joined = joined.trim();
    (!joined.is_empty()).then(|| joined.to_string())
}
