use std::sync::Arc;

use portage_core::catalog::EntityCatalog;

use crate::config::ServerConfig;
use crate::engine::ExecutionManager;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already
/// `Clone`). The entity catalog is read-only after startup and injected
/// here rather than accessed as a global, so tests can swap in their own
/// registries.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: portage_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The entity catalog, validated and ordered at startup.
    pub catalog: Arc<EntityCatalog>,
    /// Registry of in-flight import executions (per-job cancel tokens).
    pub executions: Arc<ExecutionManager>,
}
