//! Handlers for rollback preview and rollback of a finished job.
//!
//! Created records are deleted; updated records are restored from the
//! pre-image captured at execution time. Rollback is idempotent: a
//! `rolled_back` job reports zero records without error.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use portage_core::error::CoreError;
use portage_core::status::{MigrationStatus, RecordAction};
use portage_core::types::DbId;
use serde::Serialize;

use portage_db::repositories::{MigrationJobRepo, MigrationRecordRepo, TargetRecordRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::jobs::{ensure_job_exists, require_status};
use crate::response::DataResponse;
use crate::state::AppState;

/// Statuses a rollback can start from.
const ROLLBACKABLE: &[MigrationStatus] = &[MigrationStatus::Completed, MigrationStatus::Cancelled];

/// Typed response for the rollback preview endpoint.
#[derive(Debug, Serialize)]
pub struct RollbackPreview {
    pub records_to_rollback: i64,
    pub created_records: i64,
    pub updated_records: i64,
}

/// Typed response for the rollback endpoint.
#[derive(Debug, Serialize)]
pub struct RollbackResult {
    pub rolled_back_records: i64,
    pub status: String,
}

/// GET /api/v1/jobs/{id}/rollback-preview
///
/// Compute, without mutating, how many created records would be deleted
/// and how many updated records would be reversed.
pub async fn preview(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;
    require_status(&job, ROLLBACKABLE, "preview a rollback for")?;

    let counts = MigrationRecordRepo::count_by_action(&state.pool, id).await?;
    let count_for = |action: RecordAction| {
        counts
            .iter()
            .find(|(a, _)| a == action.as_str())
            .map(|(_, c)| *c)
            .unwrap_or(0)
    };

    let created = count_for(RecordAction::Created);
    let updated = count_for(RecordAction::Updated);

    Ok(Json(DataResponse {
        data: RollbackPreview {
            records_to_rollback: created + updated,
            created_records: created,
            updated_records: updated,
        },
    }))
}

/// POST /api/v1/jobs/{id}/rollback
///
/// Reverse the job's effects on the target store and transition to
/// `rolled_back`. Undoes later writes first (reverse row order).
pub async fn rollback(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;

    // Idempotence: rolling back twice is a no-op, not an error.
    if job.status()? == MigrationStatus::RolledBack {
        return Ok(Json(DataResponse {
            data: RollbackResult {
                rolled_back_records: 0,
                status: job.status,
            },
        }));
    }
    require_status(&job, ROLLBACKABLE, "roll back")?;

    let records = MigrationRecordRepo::list_by_actions(
        &state.pool,
        id,
        &[RecordAction::Created.as_str(), RecordAction::Updated.as_str()],
    )
    .await?;

    let mut rolled_back: i64 = 0;
    for record in records.iter().rev() {
        match record.action.as_deref() {
            Some("created") => {
                if let Some(target_id) = record.target_id {
                    if TargetRecordRepo::delete(&state.pool, target_id).await? {
                        rolled_back += 1;
                    }
                }
            }
            Some("updated") => {
                if let (Some(target_id), Some(previous)) =
                    (record.target_id, record.previous_data.as_ref())
                {
                    if TargetRecordRepo::update_data(&state.pool, target_id, previous)
                        .await?
                        .is_some()
                    {
                        rolled_back += 1;
                    }
                }
            }
            _ => {}
        }
    }

    if !MigrationJobRepo::mark_rolled_back(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "Job state changed concurrently during rollback".to_string(),
        )));
    }

    tracing::info!(job_id = id, rolled_back, "Job rolled back");

    Ok(Json(DataResponse {
        data: RollbackResult {
            rolled_back_records: rolled_back,
            status: MigrationStatus::RolledBack.as_str().to_string(),
        },
    }))
}
