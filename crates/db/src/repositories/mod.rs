//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod audit_repo;
pub mod role_repo;
pub mod user_role_repo;

pub use audit_repo::AuditRepo;
pub use role_repo::RoleRepo;
pub use user_role_repo::UserRoleRepo;
