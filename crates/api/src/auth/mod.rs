//! Access-token handling.
//!
//! Tokens are issued by the identity platform; this service only validates
//! them.

pub mod jwt;
