use std::sync::Arc;

use rolegate_identity::IdentityProvider;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: rolegate_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Identity platform client (a fake in tests).
    pub identity: Arc<dyn IdentityProvider>,
}
