//! Migration job model and DTOs.

use portage_core::error::CoreError;
use portage_core::mapping::{CleaningRules, FieldMapping};
use portage_core::status::{DedupStrategy, MigrationStatus};
use portage_core::types::{progress_percent, DbId, JsonMap, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `migration_jobs` table.
///
/// `source_rows` can be large, so it is never serialized directly; the
/// detail endpoint exposes a bounded sample instead.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MigrationJob {
    pub id: DbId,
    pub name: String,
    pub entity_type: String,
    pub source_type: Option<String>,
    pub status: String,
    pub total_rows: i32,
    pub processed_rows: i32,
    pub created_records: i32,
    pub updated_records: i32,
    pub skipped_records: i32,
    pub failed_records: i32,
    pub error_message: Option<String>,
    pub source_columns: serde_json::Value,
    #[serde(skip_serializing)]
    pub source_rows: serde_json::Value,
    pub field_mapping: serde_json::Value,
    pub cleaning_rules: serde_json::Value,
    pub dedup_strategy: String,
    pub dedup_fields: serde_json::Value,
    pub validation_result: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl MigrationJob {
    /// Parse the status column. The CHECK constraint keeps unknown
    /// values out of the table, so a parse failure indicates datastore
    /// corruption and is reported as an internal error.
    pub fn status(&self) -> Result<MigrationStatus, CoreError> {
        MigrationStatus::from_str(&self.status)
            .ok_or_else(|| CoreError::Internal(format!("Unknown job status '{}'", self.status)))
    }

    /// Derived progress percentage, clamped to `0..=100`.
    pub fn progress_percent(&self) -> f64 {
        progress_percent(self.processed_rows, self.total_rows)
    }

    /// Saved dedup strategy (CHECK-constrained in the database).
    pub fn dedup_strategy(&self) -> DedupStrategy {
        DedupStrategy::from_str(&self.dedup_strategy).unwrap_or_default()
    }

    /// Deserialize the saved column-to-field mapping.
    pub fn mapping(&self) -> FieldMapping {
        serde_json::from_value(self.field_mapping.clone()).unwrap_or_default()
    }

    /// Deserialize the saved cleaning rules.
    pub fn rules(&self) -> CleaningRules {
        serde_json::from_value(self.cleaning_rules.clone()).unwrap_or_default()
    }

    /// Configured dedup fields for the duplicate report.
    pub fn dedup_fields(&self) -> Vec<String> {
        serde_json::from_value(self.dedup_fields.clone()).unwrap_or_default()
    }

    /// Source column names captured at upload time.
    pub fn columns(&self) -> Vec<String> {
        serde_json::from_value(self.source_columns.clone()).unwrap_or_default()
    }

    /// All stored source rows as JSON objects, in upload order.
    pub fn rows(&self) -> Vec<JsonMap> {
        serde_json::from_value(self.source_rows.clone()).unwrap_or_default()
    }
}

/// Slim row used by the listing endpoint (heavy JSONB columns omitted).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MigrationJobSummary {
    pub id: DbId,
    pub name: String,
    pub entity_type: String,
    pub source_type: Option<String>,
    pub status: String,
    pub total_rows: i32,
    pub processed_rows: i32,
    pub created_records: i32,
    pub updated_records: i32,
    pub skipped_records: i32,
    pub failed_records: i32,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// DTO for creating a new job via `POST /jobs`.
#[derive(Debug, Deserialize)]
pub struct CreateMigrationJob {
    pub name: String,
    pub entity_type: String,
    pub source_type: Option<String>,
}

/// Query parameters for `GET /jobs`.
#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub status: Option<String>,
    pub entity_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
