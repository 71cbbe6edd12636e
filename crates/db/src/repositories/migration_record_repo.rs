//! Repository for the `migration_records` table.

use portage_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use portage_core::types::DbId;
use sqlx::PgPool;

use crate::models::migration_record::{CreateMigrationRecord, MigrationRecord, RecordListQuery};

/// Column list for `migration_records` queries.
const COLUMNS: &str = "\
    id, job_id, row_number, action, error_message, \
    source_data, transformed_data, previous_data, target_id, created_at";

/// Provides writes and queries for per-row outcomes.
pub struct MigrationRecordRepo;

impl MigrationRecordRepo {
    /// Insert one outcome row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateMigrationRecord,
    ) -> Result<MigrationRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO migration_records \
                (job_id, row_number, action, error_message, source_data, \
                 transformed_data, previous_data, target_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationRecord>(&query)
            .bind(input.job_id)
            .bind(input.row_number)
            .bind(input.action.as_str())
            .bind(&input.error_message)
            .bind(&input.source_data)
            .bind(&input.transformed_data)
            .bind(&input.previous_data)
            .bind(input.target_id)
            .fetch_one(pool)
            .await
    }

    /// List a job's records in row order, optionally filtered by action.
    pub async fn list_by_job(
        pool: &PgPool,
        job_id: DbId,
        params: &RecordListQuery,
    ) -> Result<Vec<MigrationRecord>, sqlx::Error> {
        let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
        let offset = clamp_offset(params.offset);

        let query = if params.action.is_some() {
            format!(
                "SELECT {COLUMNS} FROM migration_records \
                 WHERE job_id = $1 AND action = $2 \
                 ORDER BY row_number \
                 LIMIT $3 OFFSET $4"
            )
        } else {
            format!(
                "SELECT {COLUMNS} FROM migration_records \
                 WHERE job_id = $1 \
                 ORDER BY row_number \
                 LIMIT $2 OFFSET $3"
            )
        };

        let mut q = sqlx::query_as::<_, MigrationRecord>(&query).bind(job_id);
        if let Some(action) = &params.action {
            q = q.bind(action);
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// All records for a job whose action is in `actions`, in row order.
    /// Used by the rollback scan (no pagination; rollback must see the
    /// full set).
    pub async fn list_by_actions(
        pool: &PgPool,
        job_id: DbId,
        actions: &[&str],
    ) -> Result<Vec<MigrationRecord>, sqlx::Error> {
        let actions: Vec<String> = actions.iter().map(|a| a.to_string()).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM migration_records \
             WHERE job_id = $1 AND action = ANY($2) \
             ORDER BY row_number"
        );
        sqlx::query_as::<_, MigrationRecord>(&query)
            .bind(job_id)
            .bind(&actions)
            .fetch_all(pool)
            .await
    }

    /// Outcome counts per action for a job.
    pub async fn count_by_action(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT action, COUNT(*) FROM migration_records \
             WHERE job_id = $1 AND action IS NOT NULL \
             GROUP BY action \
             ORDER BY action",
        )
        .bind(job_id)
        .fetch_all(pool)
        .await
    }

    /// Delete all records belonging to a job. Returns the number removed.
    pub async fn delete_by_job(pool: &PgPool, job_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM migration_records WHERE job_id = $1")
            .bind(job_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
