//! Route definitions for the `/jobs` resource and its pipeline
//! operations.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{execution, jobs, mapping, rollback, upload, validation};
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                        -> list_jobs
/// POST   /                        -> create_job
/// GET    /{id}                    -> get_job
/// DELETE /{id}                    -> delete_job
/// POST   /{id}/upload             -> upload_file (multipart)
/// GET    /{id}/columns            -> get_columns
/// GET    /{id}/sample             -> get_sample
/// POST   /{id}/mapping/suggest    -> mapping::suggest
/// PUT    /{id}/mapping            -> mapping::save
/// POST   /{id}/validate           -> validation::validate
/// GET    /{id}/preview            -> validation::preview
/// GET    /{id}/duplicates         -> validation::duplicates
/// POST   /{id}/execute            -> execution::execute
/// GET    /{id}/progress           -> execution::progress
/// POST   /{id}/cancel             -> execution::cancel
/// GET    /{id}/rollback-preview   -> rollback::preview
/// POST   /{id}/rollback           -> rollback::rollback
/// GET    /{id}/records            -> execution::list_records
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::create_job))
        .route("/{id}", get(jobs::get_job).delete(jobs::delete_job))
        .route("/{id}/upload", post(upload::upload_file))
        .route("/{id}/columns", get(jobs::get_columns))
        .route("/{id}/sample", get(jobs::get_sample))
        .route("/{id}/mapping/suggest", post(mapping::suggest))
        .route("/{id}/mapping", put(mapping::save))
        .route("/{id}/validate", post(validation::validate))
        .route("/{id}/preview", get(validation::preview))
        .route("/{id}/duplicates", get(validation::duplicates))
        .route("/{id}/execute", post(execution::execute))
        .route("/{id}/progress", get(execution::progress))
        .route("/{id}/cancel", post(execution::cancel))
        .route("/{id}/rollback-preview", get(rollback::preview))
        .route("/{id}/rollback", post(rollback::rollback))
        .route("/{id}/records", get(execution::list_records))
}
