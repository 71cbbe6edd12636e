//! Repository for the `migration_jobs` table.
//!
//! Every lifecycle move is a status-guarded UPDATE: the handler checks
//! the status first to produce a friendly error, and the SQL guard is
//! the race-proof backstop (a lost race returns no row). Counter
//! increments are single statements so a concurrent progress reader can
//! never observe a torn counter set.

use portage_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use portage_core::status::{MigrationStatus, RecordAction};
use portage_core::types::DbId;
use sqlx::PgPool;

use crate::models::migration_job::{
    CreateMigrationJob, JobListQuery, MigrationJob, MigrationJobSummary,
};

/// Column list for `migration_jobs` queries.
const COLUMNS: &str = "\
    id, name, entity_type, source_type, status, \
    total_rows, processed_rows, created_records, updated_records, \
    skipped_records, failed_records, error_message, \
    source_columns, source_rows, field_mapping, cleaning_rules, \
    dedup_strategy, dedup_fields, validation_result, \
    created_at, started_at, completed_at, updated_at";

/// Column list for listing (heavy JSONB columns omitted).
const SUMMARY_COLUMNS: &str = "\
    id, name, entity_type, source_type, status, \
    total_rows, processed_rows, created_records, updated_records, \
    skipped_records, failed_records, error_message, \
    created_at, started_at, completed_at";

/// Provides CRUD operations and lifecycle transitions for migration jobs.
pub struct MigrationJobRepo;

impl MigrationJobRepo {
    /// Create a new job in `pending` status.
    pub async fn create(
        pool: &PgPool,
        input: &CreateMigrationJob,
    ) -> Result<MigrationJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO migration_jobs (name, entity_type, source_type) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationJob>(&query)
            .bind(&input.name)
            .bind(&input.entity_type)
            .bind(&input.source_type)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MigrationJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM migration_jobs WHERE id = $1");
        sqlx::query_as::<_, MigrationJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List jobs with optional status / entity-type filters, newest first.
    pub async fn list(
        pool: &PgPool,
        params: &JobListQuery,
    ) -> Result<Vec<MigrationJobSummary>, sqlx::Error> {
        let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
        let offset = clamp_offset(params.offset);

        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if params.status.is_some() {
            conditions.push(format!("status = ${bind_idx}"));
            bind_idx += 1;
        }
        if params.entity_type.is_some() {
            conditions.push(format!("entity_type = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM migration_jobs \
             {where_clause} \
             ORDER BY created_at DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, MigrationJobSummary>(&query);
        if let Some(status) = &params.status {
            q = q.bind(status);
        }
        if let Some(entity_type) = &params.entity_type {
            q = q.bind(entity_type);
        }
        q = q.bind(limit).bind(offset);

        q.fetch_all(pool).await
    }

    /// Delete a job (records cascade). Returns `false` if it did not exist.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM migration_jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store the parsed upload and move to `uploaded`.
    ///
    /// Allowed from every pre-execution status, so a corrected file can
    /// replace the old one after a failed validation; resets counters
    /// and any stale validation result.
    pub async fn save_upload(
        pool: &PgPool,
        id: DbId,
        source_type: Option<&str>,
        columns: &serde_json::Value,
        rows: &serde_json::Value,
        total_rows: i32,
    ) -> Result<Option<MigrationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE migration_jobs SET \
                status = 'uploaded', \
                source_type = COALESCE($2, source_type), \
                source_columns = $3, \
                source_rows = $4, \
                total_rows = $5, \
                processed_rows = 0, created_records = 0, updated_records = 0, \
                skipped_records = 0, failed_records = 0, \
                validation_result = NULL, \
                updated_at = NOW() \
             WHERE id = $1 AND status IN ('pending', 'uploaded', 'mapped', 'validated') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationJob>(&query)
            .bind(id)
            .bind(source_type)
            .bind(columns)
            .bind(rows)
            .bind(total_rows)
            .fetch_optional(pool)
            .await
    }

    /// Persist mapping configuration and move to `mapped`.
    ///
    /// Allowed from `uploaded`, `mapped` (re-save), and `validated`
    /// (editing the mapping invalidates the prior validation, which is
    /// why the stored result is cleared here).
    pub async fn save_mapping(
        pool: &PgPool,
        id: DbId,
        field_mapping: &serde_json::Value,
        cleaning_rules: &serde_json::Value,
        dedup_strategy: &str,
        dedup_fields: &serde_json::Value,
    ) -> Result<Option<MigrationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE migration_jobs SET \
                status = 'mapped', \
                field_mapping = $2, \
                cleaning_rules = $3, \
                dedup_strategy = $4, \
                dedup_fields = $5, \
                validation_result = NULL, \
                updated_at = NOW() \
             WHERE id = $1 AND status IN ('uploaded', 'mapped', 'validated') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationJob>(&query)
            .bind(id)
            .bind(field_mapping)
            .bind(cleaning_rules)
            .bind(dedup_strategy)
            .bind(dedup_fields)
            .fetch_optional(pool)
            .await
    }

    /// Attach a validation result; moves to `validated` when it has no
    /// errors, otherwise the job stays in `mapped` for the caller to fix.
    pub async fn save_validation(
        pool: &PgPool,
        id: DbId,
        result: &serde_json::Value,
        is_valid: bool,
    ) -> Result<Option<MigrationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE migration_jobs SET \
                status = CASE WHEN $3 THEN 'validated' ELSE 'mapped' END, \
                validation_result = $2, \
                updated_at = NOW() \
             WHERE id = $1 AND status IN ('mapped', 'validated') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationJob>(&query)
            .bind(id)
            .bind(result)
            .bind(is_valid)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim a job for execution: `validated -> running`.
    ///
    /// Returns `None` when the job is missing or not in `validated`,
    /// which also makes a second concurrent execute lose the race.
    pub async fn start_execution(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MigrationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE migration_jobs SET \
                status = 'running', \
                started_at = NOW(), \
                completed_at = NULL, \
                error_message = NULL, \
                processed_rows = 0, created_records = 0, updated_records = 0, \
                skipped_records = 0, failed_records = 0, \
                updated_at = NOW() \
             WHERE id = $1 AND status = 'validated' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Record one row outcome: bumps `processed_rows` plus exactly one
    /// per-action counter in a single statement, so readers always see a
    /// consistent counter set.
    pub async fn record_outcome(
        pool: &PgPool,
        id: DbId,
        action: RecordAction,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE migration_jobs SET \
                processed_rows = processed_rows + 1, \
                created_records = created_records + CASE WHEN $2 = 'created' THEN 1 ELSE 0 END, \
                updated_records = updated_records + CASE WHEN $2 = 'updated' THEN 1 ELSE 0 END, \
                skipped_records = skipped_records + CASE WHEN $2 = 'skipped' THEN 1 ELSE 0 END, \
                failed_records  = failed_records  + CASE WHEN $2 = 'failed'  THEN 1 ELSE 0 END, \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(action.as_str())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Terminal transition after all rows are processed.
    pub async fn complete(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        Self::finish(pool, id, MigrationStatus::Completed, None).await
    }

    /// Terminal transition after a cooperative cancel was observed.
    pub async fn cancel(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        Self::finish(pool, id, MigrationStatus::Cancelled, None).await
    }

    /// Terminal transition on a job-level fatal error.
    pub async fn fail(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        Self::finish(pool, id, MigrationStatus::Failed, Some(error)).await
    }

    async fn finish(
        pool: &PgPool,
        id: DbId,
        status: MigrationStatus,
        error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE migration_jobs SET \
                status = $2, \
                error_message = $3, \
                completed_at = NOW(), \
                updated_at = NOW() \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Final transition after a rollback: `completed | cancelled ->
    /// rolled_back`. Returns `false` when the guard did not match.
    pub async fn mark_rolled_back(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE migration_jobs SET \
                status = 'rolled_back', \
                updated_at = NOW() \
             WHERE id = $1 AND status IN ('completed', 'cancelled')",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Startup recovery: any job still `running` was interrupted by a
    /// process restart and is marked `failed` rather than silently
    /// resumed. Returns the number of jobs recovered.
    pub async fn fail_interrupted(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE migration_jobs SET \
                status = 'failed', \
                error_message = 'Execution interrupted by server restart', \
                completed_at = NOW(), \
                updated_at = NOW() \
             WHERE status = 'running'",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
