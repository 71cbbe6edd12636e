pub mod entities;
pub mod health;
pub mod jobs;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /entities                         list entity types
/// /entities/{type}/schema           full field schema
/// /entities/{type}/dependencies     direct dependencies
/// /migration-order                  dependency-ordered sequence
///
/// /jobs                             list, create
/// /jobs/{id}                        get, delete
/// /jobs/{id}/upload                 multipart CSV upload (POST)
/// /jobs/{id}/columns                uploaded column names (GET)
/// /jobs/{id}/sample                 sample rows (GET, ?limit=)
/// /jobs/{id}/mapping/suggest        propose a mapping (POST)
/// /jobs/{id}/mapping                save mapping/config (PUT)
/// /jobs/{id}/validate               dry-run validation (POST)
/// /jobs/{id}/preview                transform preview (GET, paginated)
/// /jobs/{id}/duplicates             duplicate report (GET)
/// /jobs/{id}/execute                start the import (POST)
/// /jobs/{id}/progress               live progress snapshot (GET)
/// /jobs/{id}/cancel                 cooperative cancel (POST)
/// /jobs/{id}/rollback-preview       rollback impact (GET)
/// /jobs/{id}/rollback               reverse the import (POST)
/// /jobs/{id}/records                per-row outcomes (GET, paginated)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Entity catalog (read-only).
        .nest("/entities", entities::router())
        .route("/migration-order", get(handlers::entities::migration_order))
        // Migration jobs and the pipeline operations.
        .nest("/jobs", jobs::router())
}
