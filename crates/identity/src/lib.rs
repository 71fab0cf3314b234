//! Client for the external identity platform.
//!
//! Sign-in, sessions, password recovery and TOTP factors all live on a
//! GoTrue-compatible auth service. This crate exposes those calls through the
//! [`IdentityProvider`] trait and implements it with [`GoTrueClient`].

pub mod error;
pub mod gotrue;
pub mod models;
pub mod provider;

pub use error::IdentityError;
pub use gotrue::GoTrueClient;
pub use provider::IdentityProvider;
