//! The spawned import task.
//!
//! Rows are processed in row-number order. Each row is re-transformed
//! with the same mapping and cleaning the validation pass used, matched
//! against the target store by unique-field values, and written
//! according to the dedup strategy. Row failures are recorded and never
//! abort the batch; failures to persist the outcome trail itself are
//! job-fatal, because losing it would make progress and rollback lie.

use portage_core::catalog::EntitySchema;
use portage_core::mapping::{CleaningRules, FieldMapping};
use portage_core::status::{DedupStrategy, RecordAction};
use portage_core::types::{DbId, JsonMap};
use portage_core::validation::{check_row, ValidationSeverity};
use serde_json::Value;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use portage_db::models::migration_job::MigrationJob;
use portage_db::models::migration_record::CreateMigrationRecord;
use portage_db::repositories::{MigrationJobRepo, MigrationRecordRepo, TargetRecordRepo};

use crate::state::AppState;

/// Spawn the background import task for a freshly claimed job.
///
/// The cancellation token is registered before the task is spawned so a
/// cancel request arriving immediately after `execute` returns can
/// always reach the run.
pub async fn start(state: &AppState, job: MigrationJob) {
    let cancel = state.executions.begin(job.id).await;
    let state = state.clone();

    tokio::spawn(async move {
        let job_id = job.id;
        run(&state, job, &cancel).await;
        state.executions.finish(job_id).await;
    });
}

enum RunOutcome {
    Completed { failed_rows: i32 },
    Cancelled,
}

async fn run(state: &AppState, job: MigrationJob, cancel: &CancellationToken) {
    let job_id = job.id;

    match import_rows(state, &job, cancel).await {
        Ok(RunOutcome::Completed { failed_rows }) => {
            if let Err(e) = MigrationJobRepo::complete(&state.pool, job_id).await {
                tracing::error!(job_id, error = %e, "Failed to mark job completed");
                return;
            }
            tracing::info!(job_id, failed_rows, "Import run completed");
        }
        Ok(RunOutcome::Cancelled) => {
            if let Err(e) = MigrationJobRepo::cancel(&state.pool, job_id).await {
                tracing::error!(job_id, error = %e, "Failed to mark job cancelled");
                return;
            }
            tracing::info!(job_id, "Import run cancelled");
        }
        Err(message) => {
            tracing::error!(job_id, error = %message, "Import run failed");
            if let Err(e) = MigrationJobRepo::fail(&state.pool, job_id, &message).await {
                tracing::error!(job_id, error = %e, "Failed to record job failure");
            }
        }
    }
}

async fn import_rows(
    state: &AppState,
    job: &MigrationJob,
    cancel: &CancellationToken,
) -> Result<RunOutcome, String> {
    let schema = state
        .catalog
        .schema(&job.entity_type)
        .map_err(|e| e.to_string())?;
    let mapping = job.mapping();
    let rules = job.rules();
    let strategy = job.dedup_strategy();
    let rows = job.rows();
    let unique_fields: Vec<String> = schema
        .unique_fields()
        .iter()
        .map(|f| f.to_string())
        .collect();

    let mut failed_rows = 0;

    for (i, row) in rows.iter().enumerate() {
        // Cooperative cancellation, checked at row boundaries only: the
        // in-flight row always finishes.
        if cancel.is_cancelled() {
            return Ok(RunOutcome::Cancelled);
        }

        let row_number = (i + 1) as i32;
        let outcome = import_row(
            &state.pool,
            schema,
            &mapping,
            &rules,
            strategy,
            &unique_fields,
            &job.entity_type,
            row,
            row_number,
        )
        .await;

        let (action, error_message, transformed, previous, target_id) = match outcome {
            Ok(write) => (
                write.action,
                None,
                write.transformed,
                write.previous,
                write.target_id,
            ),
            Err(failure) => {
                failed_rows += 1;
                tracing::warn!(
                    job_id = job.id,
                    row_number,
                    error = %failure.message,
                    "Row import failed"
                );
                (
                    RecordAction::Failed,
                    Some(failure.message),
                    failure.transformed,
                    None,
                    None,
                )
            }
        };

        MigrationRecordRepo::create(
            &state.pool,
            &CreateMigrationRecord {
                job_id: job.id,
                row_number,
                action,
                error_message,
                source_data: Value::Object(row.clone()),
                transformed_data: Value::Object(transformed),
                previous_data: previous,
                target_id,
            },
        )
        .await
        .map_err(|e| format!("Failed to persist outcome for row {row_number}: {e}"))?;

        MigrationJobRepo::record_outcome(&state.pool, job.id, action)
            .await
            .map_err(|e| format!("Failed to update counters at row {row_number}: {e}"))?;
    }

    Ok(RunOutcome::Completed { failed_rows })
}

struct RowWrite {
    action: RecordAction,
    transformed: JsonMap,
    previous: Option<Value>,
    target_id: Option<DbId>,
}

struct RowFailure {
    message: String,
    transformed: JsonMap,
}

#[allow(clippy::too_many_arguments)]
async fn import_row(
    pool: &PgPool,
    schema: &EntitySchema,
    mapping: &FieldMapping,
    rules: &CleaningRules,
    strategy: DedupStrategy,
    unique_fields: &[String],
    entity_type: &str,
    row: &JsonMap,
    row_number: i32,
) -> Result<RowWrite, RowFailure> {
    let (data, issues) = check_row(schema, mapping, rules, row, row_number as usize);

    // A row that reaches execution with errors (stale validation, racy
    // source edits) is recorded as failed, not written.
    if let Some(first) = issues
        .iter()
        .find(|i| i.severity == ValidationSeverity::Error)
    {
        return Err(RowFailure {
            message: format!("{}: {}", first.field, first.message),
            transformed: data,
        });
    }

    let pairs = lookup_pairs(&data, unique_fields);
    let existing = TargetRecordRepo::find_by_fields(pool, entity_type, &pairs)
        .await
        .map_err(|e| RowFailure {
            message: format!("Target lookup failed: {e}"),
            transformed: data.clone(),
        })?;

    match existing {
        None => {
            let record = TargetRecordRepo::insert(pool, entity_type, &Value::Object(data.clone()))
                .await
                .map_err(|e| RowFailure {
                    message: format!("Create failed: {e}"),
                    transformed: data.clone(),
                })?;
            Ok(RowWrite {
                action: RecordAction::Created,
                transformed: data,
                previous: None,
                target_id: Some(record.id),
            })
        }
        Some(existing) => match strategy {
            DedupStrategy::Skip => Ok(RowWrite {
                action: RecordAction::Skipped,
                transformed: data,
                previous: None,
                target_id: Some(existing.id),
            }),
            DedupStrategy::Update | DedupStrategy::Merge => {
                // Pre-image retained so rollback can restore the record.
                let previous = existing.data.clone();
                let merged = merge_data(&existing.data, &data, strategy);
                TargetRecordRepo::update_data(pool, existing.id, &merged)
                    .await
                    .map_err(|e| RowFailure {
                        message: format!("Update failed: {e}"),
                        transformed: data.clone(),
                    })?;
                Ok(RowWrite {
                    action: RecordAction::Updated,
                    transformed: data,
                    previous: Some(previous),
                    target_id: Some(existing.id),
                })
            }
        },
    }
}

/// Unique-field values present on the transformed row, rendered as text
/// the same way PostgreSQL's `data->>field` renders them.
fn lookup_pairs(data: &JsonMap, unique_fields: &[String]) -> Vec<(String, String)> {
    unique_fields
        .iter()
        .filter_map(|field| {
            data.get(field)
                .and_then(lookup_key)
                .map(|value| (field.clone(), value))
        })
        .collect()
}

fn lookup_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Combine an existing document with incoming mapped fields.
///
/// `update` overwrites every mapped field; `merge` fills only fields that
/// are currently missing, null, or empty on the existing record. Fields
/// outside the mapping are always preserved.
fn merge_data(existing: &Value, incoming: &JsonMap, strategy: DedupStrategy) -> Value {
    let mut base = existing.as_object().cloned().unwrap_or_default();

    for (key, value) in incoming {
        let overwrite = match strategy {
            DedupStrategy::Update => true,
            DedupStrategy::Merge => is_empty(base.get(key)),
            DedupStrategy::Skip => false,
        };
        if overwrite {
            base.insert(key.clone(), value.clone());
        }
    }

    Value::Object(base)
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}
