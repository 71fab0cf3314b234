/// Audit log primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Users, roles and role assignments are keyed by UUID (user ids are minted
/// by the identity platform).
pub type Uuid = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
