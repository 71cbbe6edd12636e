//! Handlers for mapping suggestion and mapping/config persistence.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use portage_core::error::CoreError;
use portage_core::mapping::{missing_required_fields, suggest_mapping, CleaningRules, FieldMapping};
use portage_core::status::{DedupStrategy, MigrationStatus};
use portage_core::types::DbId;
use serde::Deserialize;

use portage_db::repositories::MigrationJobRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::jobs::{ensure_job_exists, job_detail, require_status};
use crate::response::DataResponse;
use crate::state::AppState;

/// Statuses in which the mapping may be proposed or edited. Editing from
/// `validated` drops the job back to `mapped` (the prior validation no
/// longer describes the saved configuration).
const MAPPABLE: &[MigrationStatus] = &[
    MigrationStatus::Uploaded,
    MigrationStatus::Mapped,
    MigrationStatus::Validated,
];

/// POST /api/v1/jobs/{id}/mapping/suggest
///
/// Propose a column-to-field mapping from the uploaded columns and the
/// entity schema. Deterministic; does not persist anything.
pub async fn suggest(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;
    require_status(&job, MAPPABLE, "suggest a mapping for")?;

    let schema = state.catalog.schema(&job.entity_type)?;
    let mapping = suggest_mapping(&job.columns(), schema);

    Ok(Json(DataResponse { data: mapping }))
}

/// Request body for `PUT /jobs/{id}/mapping`.
#[derive(Debug, Deserialize)]
pub struct SaveMappingRequest {
    pub field_mapping: FieldMapping,
    #[serde(default)]
    pub cleaning_rules: Option<CleaningRules>,
    pub dedup_strategy: Option<String>,
    pub dedup_fields: Option<Vec<String>>,
}

/// PUT /api/v1/jobs/{id}/mapping
///
/// Persist the mapping, cleaning rules, and dedup configuration, and
/// move the job to `mapped`. Rejects with `IncompleteMapping` when a
/// required field has neither a mapped column nor a default.
pub async fn save(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SaveMappingRequest>,
) -> AppResult<impl IntoResponse> {
    let job = ensure_job_exists(&state.pool, id).await?;
    require_status(&job, MAPPABLE, "save a mapping for")?;

    let schema = state.catalog.schema(&job.entity_type)?;
    let columns = job.columns();

    for (column, field) in &input.field_mapping {
        if !columns.contains(column) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Unknown source column '{column}'"
            ))));
        }
        if schema.field(field).is_none() {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Unknown target field '{field}'"
            ))));
        }
    }

    let rules = input.cleaning_rules.unwrap_or_default();
    for field in rules.keys() {
        if schema.field(field).is_none() {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Cleaning rule targets unknown field '{field}'"
            ))));
        }
    }

    let strategy = match &input.dedup_strategy {
        None => DedupStrategy::default(),
        Some(s) => DedupStrategy::from_str(s).ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "Unknown dedup strategy '{}'. Must be one of: {}",
                s,
                DedupStrategy::ALL.join(", ")
            )))
        })?,
    };

    let dedup_fields = input.dedup_fields.unwrap_or_default();
    for field in &dedup_fields {
        if schema.field(field).is_none() {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Dedup field '{field}' is not part of the schema"
            ))));
        }
    }

    let missing = missing_required_fields(schema, &input.field_mapping, &rules);
    if !missing.is_empty() {
        return Err(AppError::Core(CoreError::IncompleteMapping { missing }));
    }

    let mapping_json = serde_json::to_value(&input.field_mapping)
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let rules_json =
        serde_json::to_value(&rules).map_err(|e| AppError::InternalError(e.to_string()))?;
    let dedup_fields_json =
        serde_json::to_value(&dedup_fields).map_err(|e| AppError::InternalError(e.to_string()))?;

    let updated = MigrationJobRepo::save_mapping(
        &state.pool,
        id,
        &mapping_json,
        &rules_json,
        strategy.as_str(),
        &dedup_fields_json,
    )
    .await?
    .ok_or_else(|| {
        AppError::Core(CoreError::Conflict(
            "Job state changed concurrently".to_string(),
        ))
    })?;

    tracing::info!(
        job_id = id,
        mapped_fields = input.field_mapping.len(),
        dedup_strategy = %strategy,
        "Field mapping saved"
    );

    Ok(Json(DataResponse {
        data: job_detail(updated),
    }))
}
