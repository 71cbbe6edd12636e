//! Handlers for import execution: start, live progress, cooperative
//! cancel, and per-row outcome listing.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use portage_core::error::CoreError;
use portage_core::status::{MigrationStatus, RecordAction};
use portage_core::types::{DbId, Timestamp};
use serde::Serialize;

use portage_db::models::migration_job::MigrationJob;
use portage_db::models::migration_record::RecordListQuery;
use portage_db::repositories::{MigrationJobRepo, MigrationRecordRepo};

use crate::engine::executor;
use crate::error::{AppError, AppResult};
use crate::handlers::jobs::{ensure_job_exists, require_status};
use crate::response::DataResponse;
use crate::state::AppState;

/// Live progress snapshot for a job.
///
/// Counters come from a single row read, and the executor bumps them in
/// single statements, so a snapshot is never torn.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub job_id: DbId,
    pub status: String,
    pub total_rows: i32,
    pub processed_rows: i32,
    pub created_records: i32,
    pub updated_records: i32,
    pub skipped_records: i32,
    pub failed_records: i32,
    pub progress_percent: f64,
    pub error_message: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl From<&MigrationJob> for ProgressResponse {
    fn from(job: &MigrationJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status.clone(),
            total_rows: job.total_rows,
            processed_rows: job.processed_rows,
            created_records: job.created_records,
            updated_records: job.updated_records,
            skipped_records: job.skipped_records,
            failed_records: job.failed_records,
            progress_percent: job.progress_percent(),
            error_message: job.error_message.clone(),
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

/// POST /api/v1/jobs/{id}/execute
///
/// Claim a validated job (`validated -> running`, atomically) and spawn
/// the background import task. Returns 202 with the initial progress
/// snapshot; progress is then queryable concurrently while the run
/// proceeds.
pub async fn execute(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;
    // Friendly precondition check; the guarded UPDATE below is the
    // atomic claim that settles races.
    require_status(&job, &[MigrationStatus::Validated], "execute")?;

    let Some(claimed) = MigrationJobRepo::start_execution(&state.pool, id).await? else {
        let job = ensure_job_exists(&state.pool, id).await?;
        return Err(AppError::Core(CoreError::invalid_state(
            "execute",
            job.status,
        )));
    };

    tracing::info!(
        job_id = id,
        total_rows = claimed.total_rows,
        "Import execution started"
    );

    let response = ProgressResponse::from(&claimed);
    executor::start(&state, claimed).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse { data: response }),
    ))
}

/// GET /api/v1/jobs/{id}/progress
///
/// Current progress snapshot; valid in any status.
pub async fn progress(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: ProgressResponse::from(&job),
    }))
}

/// Typed response for the cancel endpoint.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/v1/jobs/{id}/cancel
///
/// Request cooperative cancellation of a running job. The in-flight row
/// finishes, no further rows start, and already-processed rows keep
/// their outcomes (cancellation is not a rollback).
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;
    require_status(&job, &[MigrationStatus::Running], "cancel")?;

    let signalled = state.executions.cancel(id).await;
    let message = if signalled {
        "Cancellation requested; the in-flight row will finish before the job stops".to_string()
    } else {
        "No active execution registered for this job".to_string()
    };

    tracing::info!(job_id = id, signalled, "Cancellation requested");

    Ok(Json(DataResponse {
        data: CancelResponse {
            success: signalled,
            message,
        },
    }))
}

/// GET /api/v1/jobs/{id}/records?action=&limit=&offset=
///
/// Per-row outcomes in row order, optionally filtered by action.
pub async fn list_records(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<RecordListQuery>,
) -> AppResult<impl IntoResponse> {
    ensure_job_exists(&state.pool, id).await?;

    if let Some(action) = &params.action {
        if RecordAction::from_str(action).is_none() {
            return Err(AppError::BadRequest(format!(
                "Unknown action '{}'. Must be one of: {}",
                action,
                RecordAction::ALL.join(", ")
            )));
        }
    }

    let records = MigrationRecordRepo::list_by_job(&state.pool, id, &params).await?;
    Ok(Json(DataResponse { data: records }))
}
