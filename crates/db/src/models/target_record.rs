//! Target data store model.
//!
//! Imported business records live here as one JSONB document per record;
//! the import pipeline looks them up by unique-field values.

use portage_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `target_records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TargetRecord {
    pub id: DbId,
    pub entity_type: String,
    pub data: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
