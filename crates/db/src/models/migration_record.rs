//! Per-row outcome model and DTOs.

use portage_core::status::RecordAction;
use portage_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `migration_records` table: one source row's outcome.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MigrationRecord {
    pub id: DbId,
    pub job_id: DbId,
    /// 1-based source row number, stable across validate and execute.
    pub row_number: i32,
    pub action: Option<String>,
    pub error_message: Option<String>,
    pub source_data: serde_json::Value,
    pub transformed_data: serde_json::Value,
    /// Pre-image of the target record before an update/merge write.
    pub previous_data: Option<serde_json::Value>,
    pub target_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// DTO for inserting one outcome row during execution.
#[derive(Debug)]
pub struct CreateMigrationRecord {
    pub job_id: DbId,
    pub row_number: i32,
    pub action: RecordAction,
    pub error_message: Option<String>,
    pub source_data: serde_json::Value,
    pub transformed_data: serde_json::Value,
    pub previous_data: Option<serde_json::Value>,
    pub target_id: Option<DbId>,
}

/// Query parameters for `GET /jobs/{id}/records`.
#[derive(Debug, Deserialize)]
pub struct RecordListQuery {
    pub action: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
