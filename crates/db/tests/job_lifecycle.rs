//! Integration tests for the migration job repository: guarded
//! lifecycle transitions, counter invariants, and crash recovery.

use portage_core::status::RecordAction;
use portage_db::models::migration_job::{CreateMigrationJob, JobListQuery};
use portage_db::repositories::MigrationJobRepo;
use sqlx::PgPool;

fn new_job(name: &str) -> CreateMigrationJob {
    CreateMigrationJob {
        name: name.to_string(),
        entity_type: "customers".to_string(),
        source_type: None,
    }
}

fn rows(n: usize) -> serde_json::Value {
    serde_json::Value::Array(
        (0..n)
            .map(|i| serde_json::json!({ "name": format!("row {i}") }))
            .collect(),
    )
}

async fn uploaded_job(pool: &PgPool, name: &str, total: i32) -> i64 {
    let job = MigrationJobRepo::create(pool, &new_job(name)).await.unwrap();
    MigrationJobRepo::save_upload(
        pool,
        job.id,
        Some("csv"),
        &serde_json::json!(["name"]),
        &rows(total as usize),
        total,
    )
    .await
    .unwrap()
    .expect("upload from pending must succeed");
    job.id
}

// ---------------------------------------------------------------------------
// Test: creation defaults
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_defaults(pool: PgPool) {
    let job = MigrationJobRepo::create(&pool, &new_job("Fresh")).await.unwrap();
    assert_eq!(job.status, "pending");
    assert_eq!(job.total_rows, 0);
    assert_eq!(job.processed_rows, 0);
    assert_eq!(job.dedup_strategy, "skip");
    assert!(job.started_at.is_none());
    assert!(job.validation_result.is_none());
}

// ---------------------------------------------------------------------------
// Test: guarded transitions return None from illegal statuses
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_save_mapping_requires_upload(pool: PgPool) {
    let job = MigrationJobRepo::create(&pool, &new_job("Premature")).await.unwrap();
    let result = MigrationJobRepo::save_mapping(
        &pool,
        job.id,
        &serde_json::json!({"name": "name"}),
        &serde_json::json!({}),
        "skip",
        &serde_json::json!([]),
    )
    .await
    .unwrap();
    assert!(result.is_none(), "mapping a pending job must be refused");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_start_execution_requires_validated(pool: PgPool) {
    let id = uploaded_job(&pool, "Eager", 2).await;

    // uploaded -> running is not a legal claim.
    assert!(MigrationJobRepo::start_execution(&pool, id)
        .await
        .unwrap()
        .is_none());

    MigrationJobRepo::save_mapping(
        &pool,
        id,
        &serde_json::json!({"name": "name"}),
        &serde_json::json!({}),
        "skip",
        &serde_json::json!([]),
    )
    .await
    .unwrap()
    .expect("mapping an uploaded job succeeds");

    MigrationJobRepo::save_validation(&pool, id, &serde_json::json!({"is_valid": true}), true)
        .await
        .unwrap()
        .expect("validating a mapped job succeeds");

    let claimed = MigrationJobRepo::start_execution(&pool, id).await.unwrap();
    let claimed = claimed.expect("validated job must be claimable");
    assert_eq!(claimed.status, "running");
    assert!(claimed.started_at.is_some());

    // A second claim loses the race.
    assert!(MigrationJobRepo::start_execution(&pool, id)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_validation_keeps_job_mapped(pool: PgPool) {
    let id = uploaded_job(&pool, "Invalid", 1).await;
    MigrationJobRepo::save_mapping(
        &pool,
        id,
        &serde_json::json!({"name": "name"}),
        &serde_json::json!({}),
        "skip",
        &serde_json::json!([]),
    )
    .await
    .unwrap()
    .unwrap();

    let job = MigrationJobRepo::save_validation(
        &pool,
        id,
        &serde_json::json!({"is_valid": false, "error_count": 3}),
        false,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(job.status, "mapped");
    assert!(job.validation_result.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reupload_clears_validation(pool: PgPool) {
    let id = uploaded_job(&pool, "Fixable", 1).await;
    MigrationJobRepo::save_mapping(
        &pool,
        id,
        &serde_json::json!({"name": "name"}),
        &serde_json::json!({}),
        "skip",
        &serde_json::json!([]),
    )
    .await
    .unwrap()
    .unwrap();
    MigrationJobRepo::save_validation(&pool, id, &serde_json::json!({"is_valid": true}), true)
        .await
        .unwrap()
        .unwrap();

    let job = MigrationJobRepo::save_upload(
        &pool,
        id,
        Some("csv"),
        &serde_json::json!(["name"]),
        &rows(2),
        2,
    )
    .await
    .unwrap()
    .expect("re-upload from validated must succeed");
    assert_eq!(job.status, "uploaded");
    assert!(job.validation_result.is_none());
    assert_eq!(job.total_rows, 2);
}

// ---------------------------------------------------------------------------
// Test: counter invariant across outcome recording
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_record_outcome_counters(pool: PgPool) {
    let id = uploaded_job(&pool, "Counting", 4).await;
    MigrationJobRepo::save_mapping(
        &pool,
        id,
        &serde_json::json!({"name": "name"}),
        &serde_json::json!({}),
        "skip",
        &serde_json::json!([]),
    )
    .await
    .unwrap()
    .unwrap();
    MigrationJobRepo::save_validation(&pool, id, &serde_json::json!({"is_valid": true}), true)
        .await
        .unwrap()
        .unwrap();
    MigrationJobRepo::start_execution(&pool, id).await.unwrap().unwrap();

    for action in [
        RecordAction::Created,
        RecordAction::Updated,
        RecordAction::Skipped,
        RecordAction::Failed,
    ] {
        MigrationJobRepo::record_outcome(&pool, id, action).await.unwrap();
    }

    let job = MigrationJobRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(job.processed_rows, 4);
    assert_eq!(job.created_records, 1);
    assert_eq!(job.updated_records, 1);
    assert_eq!(job.skipped_records, 1);
    assert_eq!(job.failed_records, 1);
    assert_eq!(
        job.created_records + job.updated_records + job.skipped_records + job.failed_records,
        job.processed_rows
    );

    MigrationJobRepo::complete(&pool, id).await.unwrap();
    let job = MigrationJobRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(job.status, "completed");
    assert!(job.completed_at.is_some());
}

// ---------------------------------------------------------------------------
// Test: finishers only apply to running jobs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_finishers_guarded_by_running(pool: PgPool) {
    let id = uploaded_job(&pool, "Guarded", 1).await;

    MigrationJobRepo::fail(&pool, id, "boom").await.unwrap();
    let job = MigrationJobRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    // Not running, so the fail was a no-op.
    assert_eq!(job.status, "uploaded");
    assert!(job.error_message.is_none());
}

// ---------------------------------------------------------------------------
// Test: rollback transition guard
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mark_rolled_back_guard(pool: PgPool) {
    let id = uploaded_job(&pool, "NoRollback", 1).await;
    assert!(!MigrationJobRepo::mark_rolled_back(&pool, id).await.unwrap());

    sqlx::query("UPDATE migration_jobs SET status = 'completed' WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();
    assert!(MigrationJobRepo::mark_rolled_back(&pool, id).await.unwrap());
    // Idempotence at the SQL layer: the second attempt matches nothing.
    assert!(!MigrationJobRepo::mark_rolled_back(&pool, id).await.unwrap());
}

// ---------------------------------------------------------------------------
// Test: startup recovery of interrupted runs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_fail_interrupted(pool: PgPool) {
    let id = uploaded_job(&pool, "Interrupted", 1).await;
    sqlx::query("UPDATE migration_jobs SET status = 'running' WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    let recovered = MigrationJobRepo::fail_interrupted(&pool).await.unwrap();
    assert_eq!(recovered, 1);

    let job = MigrationJobRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(job.status, "failed");
    assert!(job.error_message.as_deref().unwrap().contains("interrupted"));
    assert!(job.completed_at.is_some());

    // Nothing left to recover on a second pass.
    assert_eq!(MigrationJobRepo::fail_interrupted(&pool).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Test: listing filters and pagination
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_filters(pool: PgPool) {
    MigrationJobRepo::create(&pool, &new_job("One")).await.unwrap();
    let two = MigrationJobRepo::create(
        &pool,
        &CreateMigrationJob {
            name: "Two".to_string(),
            entity_type: "products".to_string(),
            source_type: None,
        },
    )
    .await
    .unwrap();

    let all = MigrationJobRepo::list(&pool, &JobListQuery {
        status: None,
        entity_type: None,
        limit: None,
        offset: None,
    })
    .await
    .unwrap();
    assert_eq!(all.len(), 2);

    let products = MigrationJobRepo::list(&pool, &JobListQuery {
        status: None,
        entity_type: Some("products".to_string()),
        limit: None,
        offset: None,
    })
    .await
    .unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, two.id);

    let paged = MigrationJobRepo::list(&pool, &JobListQuery {
        status: Some("pending".to_string()),
        entity_type: None,
        limit: Some(1),
        offset: Some(1),
    })
    .await
    .unwrap();
    assert_eq!(paged.len(), 1);
}
