//! Route definitions for the entity catalog.

use axum::routing::get;
use axum::Router;

use crate::handlers::entities;
use crate::state::AppState;

/// Routes mounted at `/entities`.
///
/// ```text
/// GET /                        -> list_entities
/// GET /{type}/schema           -> entity_schema
/// GET /{type}/dependencies     -> entity_dependencies
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(entities::list_entities))
        .route("/{type}/schema", get(entities::entity_schema))
        .route("/{type}/dependencies", get(entities::entity_dependencies))
}
