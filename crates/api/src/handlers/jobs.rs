//! Handlers for the `/jobs` resource: creation, listing, detail, delete,
//! and the uploaded-source inspection endpoints (columns, sample rows).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use portage_core::error::CoreError;
use portage_core::pagination::{clamp_limit, DEFAULT_SAMPLE_LIMIT, MAX_SAMPLE_LIMIT};
use portage_core::status::MigrationStatus;
use portage_core::types::DbId;
use serde::Serialize;
use serde_json::Value;

use portage_db::models::migration_job::{CreateMigrationJob, JobListQuery, MigrationJob};
use portage_db::repositories::MigrationJobRepo;

use crate::error::{AppError, AppResult};
use crate::query::SampleParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Fetch a job by ID or fail with `NotFound`.
pub(crate) async fn ensure_job_exists(
    pool: &sqlx::PgPool,
    id: DbId,
) -> AppResult<MigrationJob> {
    MigrationJobRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "MigrationJob",
                id,
            })
        })
}

/// Reject the call with `InvalidState` (naming the current status) unless
/// the job is in one of the allowed statuses.
pub(crate) fn require_status(
    job: &MigrationJob,
    allowed: &[MigrationStatus],
    operation: &'static str,
) -> AppResult<MigrationStatus> {
    let status = job.status()?;
    if !allowed.contains(&status) {
        return Err(AppError::Core(CoreError::invalid_state(
            operation,
            status.as_str(),
        )));
    }
    Ok(status)
}

// ---------------------------------------------------------------------------
// Detail view
// ---------------------------------------------------------------------------

/// Job detail response: the row plus derived progress and a bounded
/// sample of the stored source rows.
#[derive(Debug, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: MigrationJob,
    pub progress_percent: f64,
    pub sample_rows: Vec<Value>,
}

pub(crate) fn job_detail(job: MigrationJob) -> JobDetail {
    let progress_percent = job.progress_percent();
    let sample_rows = job
        .rows()
        .into_iter()
        .take(DEFAULT_SAMPLE_LIMIT as usize)
        .map(Value::Object)
        .collect();
    JobDetail {
        job,
        progress_percent,
        sample_rows,
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Create a new migration job in `pending` status. The entity type must
/// be registered in the catalog.
pub async fn create_job(
    State(state): State<AppState>,
    Json(input): Json<CreateMigrationJob>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Job name must not be empty".to_string(),
        )));
    }
    state.catalog.schema(&input.entity_type)?;

    let job = MigrationJobRepo::create(&state.pool, &input).await?;

    tracing::info!(
        job_id = job.id,
        entity_type = %job.entity_type,
        "Migration job created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: job_detail(job),
        }),
    ))
}

// ---------------------------------------------------------------------------
// List / Get / Delete
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs?status=&entity_type=&limit=&offset=
///
/// List jobs, newest first, with optional filters.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    if let Some(status) = &params.status {
        if MigrationStatus::from_str(status).is_none() {
            return Err(AppError::BadRequest(format!(
                "Unknown status '{}'. Must be one of: {}",
                status,
                MigrationStatus::ALL.join(", ")
            )));
        }
    }

    let jobs = MigrationJobRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}
///
/// Full job detail including mapping/config, validation result, derived
/// progress, and sample rows.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: job_detail(job),
    }))
}

/// DELETE /api/v1/jobs/{id}
///
/// Delete a job in any status; its records cascade. A running execution
/// is cancelled cooperatively first.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;

    if job.status()? == MigrationStatus::Running {
        state.executions.cancel(id).await;
    }

    MigrationJobRepo::delete(&state.pool, id).await?;
    tracing::info!(job_id = id, "Migration job deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Source inspection
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}/columns
///
/// Column names captured at upload time.
pub async fn get_columns(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;
    if job.status()? == MigrationStatus::Pending {
        return Err(AppError::Core(CoreError::invalid_state(
            "read columns of",
            MigrationStatus::Pending.as_str(),
        )));
    }
    Ok(Json(DataResponse {
        data: job.columns(),
    }))
}

/// GET /api/v1/jobs/{id}/sample?limit=
///
/// A bounded sample of the stored source rows, in upload order.
pub async fn get_sample(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<SampleParams>,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;
    if job.status()? == MigrationStatus::Pending {
        return Err(AppError::Core(CoreError::invalid_state(
            "sample rows of",
            MigrationStatus::Pending.as_str(),
        )));
    }

    let limit = clamp_limit(params.limit, DEFAULT_SAMPLE_LIMIT, MAX_SAMPLE_LIMIT) as usize;
    let rows: Vec<Value> = job
        .rows()
        .into_iter()
        .take(limit)
        .map(Value::Object)
        .collect();

    Ok(Json(DataResponse { data: rows }))
}
