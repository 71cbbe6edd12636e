//! Handlers for the dry-run validation pass, the transform preview, and
//! the duplicate report. All three are read-only with respect to the
//! target store; only `validate` touches the job row (to attach its
//! result and advance the status).

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use portage_core::error::CoreError;
use portage_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use portage_core::status::MigrationStatus;
use portage_core::types::DbId;
use portage_core::validation::{
    check_row, find_duplicates, validate_rows, ValidationIssue, ValidationResult,
};
use serde::Serialize;
use serde_json::Value;

use portage_db::repositories::MigrationJobRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::jobs::{ensure_job_exists, require_status};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Statuses with a saved mapping to dry-run against.
const VALIDATABLE: &[MigrationStatus] = &[MigrationStatus::Mapped, MigrationStatus::Validated];

/// Typed response for the validate endpoint: the recomputed result plus
/// the status the job landed in (`validated`, or still `mapped` when the
/// result has errors).
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub status: String,
    pub validation: ValidationResult,
}

/// POST /api/v1/jobs/{id}/validate
///
/// Run the full dry-run pass over the stored source rows. Idempotent:
/// the same mapping and source data always produce the same result.
pub async fn validate(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;
    require_status(&job, VALIDATABLE, "validate")?;

    let schema = state.catalog.schema(&job.entity_type)?;
    let result = validate_rows(schema, &job.mapping(), &job.rules(), &job.rows());

    let result_json =
        serde_json::to_value(&result).map_err(|e| AppError::InternalError(e.to_string()))?;
    let updated = MigrationJobRepo::save_validation(&state.pool, id, &result_json, result.is_valid)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Job state changed concurrently".to_string(),
            ))
        })?;

    tracing::info!(
        job_id = id,
        error_count = result.error_count,
        warning_count = result.warning_count,
        is_valid = result.is_valid,
        "Validation pass finished"
    );

    Ok(Json(DataResponse {
        data: ValidateResponse {
            status: updated.status,
            validation: result,
        },
    }))
}

/// One row of the transform preview.
#[derive(Debug, Serialize)]
pub struct PreviewRow {
    pub row_number: usize,
    pub source: Value,
    pub transformed: Value,
    pub warnings: Vec<ValidationIssue>,
}

/// GET /api/v1/jobs/{id}/preview?limit=&offset=
///
/// Paginated, restartable view of transform output for human inspection
/// before execution. Row-local issues are included; batch-level
/// bookkeeping (uniqueness scans) is not re-run here.
pub async fn preview(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;
    require_status(&job, VALIDATABLE, "preview")?;

    let schema = state.catalog.schema(&job.entity_type)?;
    let mapping = job.mapping();
    let rules = job.rules();

    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT) as usize;
    let offset = clamp_offset(params.offset) as usize;

    let page: Vec<PreviewRow> = job
        .rows()
        .into_iter()
        .enumerate()
        .skip(offset)
        .take(limit)
        .map(|(i, row)| {
            let row_number = i + 1;
            let (transformed, warnings) = check_row(schema, &mapping, &rules, &row, row_number);
            PreviewRow {
                row_number,
                source: Value::Object(row),
                transformed: Value::Object(transformed),
                warnings,
            }
        })
        .collect();

    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/jobs/{id}/duplicates
///
/// Report values of the configured dedup fields appearing on more than
/// one row. Falls back to the schema's unique fields when no dedup
/// fields were configured. Informational only; never alters job state.
pub async fn duplicates(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;

    let status = job.status()?;
    if matches!(status, MigrationStatus::Pending | MigrationStatus::Uploaded) {
        return Err(AppError::Core(CoreError::invalid_state(
            "report duplicates for",
            status.as_str(),
        )));
    }

    let schema = state.catalog.schema(&job.entity_type)?;
    let mut dedup_fields = job.dedup_fields();
    if dedup_fields.is_empty() {
        dedup_fields = schema.unique_fields().iter().map(|f| f.to_string()).collect();
    }

    let report = find_duplicates(schema, &job.mapping(), &job.rules(), &job.rows(), &dedup_fields);

    Ok(Json(DataResponse { data: report }))
}
