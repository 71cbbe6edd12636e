//! Handler for the multipart source-file upload endpoint.

use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use portage_core::error::CoreError;
use portage_core::status::MigrationStatus;
use portage_core::types::DbId;
use serde::Serialize;
use serde_json::Value;

use portage_db::repositories::MigrationJobRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::jobs::{ensure_job_exists, require_status};
use crate::parser::parse_csv;
use crate::response::DataResponse;
use crate::state::AppState;

/// Typed response for the upload endpoint.
#[derive(Debug, Serialize)]
pub struct UploadResult {
    pub job_id: DbId,
    pub file_name: String,
    pub columns: Vec<String>,
    pub total_rows: i32,
}

/// POST /api/v1/jobs/{id}/upload
///
/// Accept a multipart CSV upload, parse it into columns and rows, and
/// store the parsed source on the job. Re-uploading replaces the prior
/// source and resets counters and any stale validation result.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;
    require_status(
        &job,
        &[
            MigrationStatus::Pending,
            MigrationStatus::Uploaded,
            MigrationStatus::Mapped,
            MigrationStatus::Validated,
        ],
        "upload a file to",
    )?;

    // Take the first file part; additional parts are ignored.
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.file_name().is_some() || field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("upload.csv").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            file = Some((file_name, bytes.to_vec()));
            break;
        }
    }

    let Some((file_name, bytes)) = file else {
        return Err(AppError::BadRequest(
            "No file received in multipart upload".to_string(),
        ));
    };

    let parsed = parse_csv(&bytes).map_err(AppError::BadRequest)?;
    let total_rows = parsed.rows.len() as i32;

    let source_type = file_name
        .rsplit('.')
        .next()
        .filter(|ext| !ext.is_empty() && *ext != file_name)
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "csv".to_string());

    let columns = serde_json::to_value(&parsed.columns)
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let rows = Value::Array(parsed.rows.into_iter().map(Value::Object).collect());

    let updated = MigrationJobRepo::save_upload(
        &state.pool,
        id,
        Some(&source_type),
        &columns,
        &rows,
        total_rows,
    )
    .await?
    .ok_or_else(|| {
        AppError::Core(CoreError::Conflict(
            "Job state changed concurrently".to_string(),
        ))
    })?;

    tracing::info!(
        job_id = updated.id,
        file_name = %file_name,
        total_rows,
        "Source file uploaded"
    );

    Ok(Json(DataResponse {
        data: UploadResult {
            job_id: updated.id,
            file_name,
            columns: updated.columns(),
            total_rows,
        },
    }))
}
