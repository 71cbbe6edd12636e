//! Repository for the `target_records` table: the target data store the
//! import writes into and rollback reverses.

use portage_core::types::DbId;
use sqlx::PgPool;

use crate::models::target_record::TargetRecord;

/// Column list for `target_records` queries.
const COLUMNS: &str = "id, entity_type, data, created_at, updated_at";

/// Provides create/update-by-unique-key operations and unique-field
/// lookups against the target store.
pub struct TargetRecordRepo;

impl TargetRecordRepo {
    /// Insert a new record.
    pub async fn insert(
        pool: &PgPool,
        entity_type: &str,
        data: &serde_json::Value,
    ) -> Result<TargetRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO target_records (entity_type, data) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TargetRecord>(&query)
            .bind(entity_type)
            .bind(data)
            .fetch_one(pool)
            .await
    }

    /// Find a record by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TargetRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM target_records WHERE id = $1");
        sqlx::query_as::<_, TargetRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the first record of an entity type whose document matches all
    /// of the given `(field, value)` pairs, comparing as text.
    ///
    /// Returns `None` when `pairs` is empty; an entity with no unique
    /// fields can never match an existing record.
    pub async fn find_by_fields(
        pool: &PgPool,
        entity_type: &str,
        pairs: &[(String, String)],
    ) -> Result<Option<TargetRecord>, sqlx::Error> {
        if pairs.is_empty() {
            return Ok(None);
        }

        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 2;
        for _ in pairs {
            conditions.push(format!("data->>${bind_idx} = ${}", bind_idx + 1));
            bind_idx += 2;
        }

        let query = format!(
            "SELECT {COLUMNS} FROM target_records \
             WHERE entity_type = $1 AND {} \
             ORDER BY id \
             LIMIT 1",
            conditions.join(" AND ")
        );

        let mut q = sqlx::query_as::<_, TargetRecord>(&query).bind(entity_type);
        for (field, value) in pairs {
            q = q.bind(field).bind(value);
        }
        q.fetch_optional(pool).await
    }

    /// Replace a record's document. Returns the updated row.
    pub async fn update_data(
        pool: &PgPool,
        id: DbId,
        data: &serde_json::Value,
    ) -> Result<Option<TargetRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE target_records SET data = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TargetRecord>(&query)
            .bind(id)
            .bind(data)
            .fetch_optional(pool)
            .await
    }

    /// Delete a record. Returns `false` if it did not exist (already
    /// removed by an earlier rollback pass, for example).
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM target_records WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
