//! Handlers for the entity catalog endpoints.
//!
//! The catalog is read-only after startup, so these handlers never touch
//! the database.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use portage_core::catalog::EntityInfo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/entities
///
/// List all importable entity types with their required/unique fields
/// and dependencies.
pub async fn list_entities(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let entities: Vec<EntityInfo> = state.catalog.entities().iter().map(|e| e.info()).collect();
    Ok(Json(DataResponse { data: entities }))
}

/// GET /api/v1/migration-order
///
/// Dependency-ordered migration sequence, computed once at startup.
pub async fn migration_order(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(DataResponse {
        data: state.catalog.migration_order().to_vec(),
    }))
}

/// GET /api/v1/entities/{type}/dependencies
///
/// Direct dependencies of an entity type (not transitive).
pub async fn entity_dependencies(
    State(state): State<AppState>,
    Path(entity_type): Path<String>,
) -> AppResult<impl IntoResponse> {
    let dependencies: Vec<EntityInfo> = state
        .catalog
        .dependencies(&entity_type)?
        .into_iter()
        .map(|e| e.info())
        .collect();
    Ok(Json(DataResponse { data: dependencies }))
}

/// GET /api/v1/entities/{type}/schema
///
/// Full field schema for an entity type.
pub async fn entity_schema(
    State(state): State<AppState>,
    Path(entity_type): Path<String>,
) -> AppResult<impl IntoResponse> {
    let schema = state.catalog.schema(&entity_type)?.clone();
    Ok(Json(DataResponse { data: schema }))
}
