//! Domain logic shared by the database, identity and API crates.
//!
//! Nothing in here performs I/O.

pub mod audit;
pub mod error;
pub mod pagination;
pub mod roles;
pub mod types;
pub mod validation;
