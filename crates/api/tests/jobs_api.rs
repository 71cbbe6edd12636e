//! HTTP-level integration tests for job CRUD and state-machine legality.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, delete, get, post_empty, post_json};
use serde_json::json;
use sqlx::PgPool;

async fn create_job(app: &axum::Router, name: &str, entity_type: &str) -> i64 {
    let response = post_json(
        app,
        "/api/v1/jobs",
        json!({ "name": name, "entity_type": entity_type }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    json["data"]["id"].as_i64().unwrap()
}

// ---------------------------------------------------------------------------
// Test: create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_job(pool: PgPool) {
    let app = build_test_app(pool);
    let response = post_json(
        &app,
        "/api/v1/jobs",
        json!({ "name": "Customer import", "entity_type": "customers" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["status"], "pending");
    assert_eq!(data["entity_type"], "customers");
    assert_eq!(data["total_rows"], 0);
    assert_eq!(data["progress_percent"], 0.0);
    assert!(data["sample_rows"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_job_unknown_entity_type(pool: PgPool) {
    let app = build_test_app(pool);
    let response = post_json(
        &app,
        "/api/v1/jobs",
        json!({ "name": "Nope", "entity_type": "widgets" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNKNOWN_ENTITY_TYPE");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_job_empty_name(pool: PgPool) {
    let app = build_test_app(pool);
    let response = post_json(
        &app,
        "/api/v1/jobs",
        json!({ "name": "   ", "entity_type": "customers" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: list with filters
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_jobs_with_filters(pool: PgPool) {
    let app = build_test_app(pool);
    create_job(&app, "First", "customers").await;
    create_job(&app, "Second", "products").await;

    let response = get(&app, "/api/v1/jobs").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let response = get(&app, "/api/v1/jobs?entity_type=products").await;
    let json = body_json(response).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["name"], "Second");

    let response = get(&app, "/api/v1/jobs?status=pending").await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let response = get(&app, "/api/v1/jobs?status=sleeping").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: get / delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_get_missing_job(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(&app, "/api/v1/jobs/4242").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_job(pool: PgPool) {
    let app = build_test_app(pool);
    let id = create_job(&app, "Doomed", "customers").await;

    let response = delete(&app, &format!("/api/v1/jobs/{id}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(&app, &format!("/api/v1/jobs/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: operations reject illegal source statuses with INVALID_STATE
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_state_machine_legality_on_pending_job(pool: PgPool) {
    let app = build_test_app(pool);
    let id = create_job(&app, "Stateful", "customers").await;

    // Every pipeline operation that needs an uploaded/mapped/validated/
    // running/finished job must name the current status in its rejection.
    let post_paths = [
        "mapping/suggest",
        "validate",
        "execute",
        "cancel",
        "rollback",
    ];
    for path in post_paths {
        let response = post_empty(&app, &format!("/api/v1/jobs/{id}/{path}")).await;
        assert_eq!(
            response.status(),
            StatusCode::CONFLICT,
            "POST {path} on a pending job should be rejected"
        );
        let json = body_json(response).await;
        assert_eq!(json["code"], "INVALID_STATE", "POST {path}");
        assert!(
            json["error"].as_str().unwrap().contains("'pending'"),
            "error should name the current status: {}",
            json["error"]
        );
    }

    let get_paths = ["columns", "sample", "preview", "duplicates", "rollback-preview"];
    for path in get_paths {
        let response = get(&app, &format!("/api/v1/jobs/{id}/{path}")).await;
        assert_eq!(
            response.status(),
            StatusCode::CONFLICT,
            "GET {path} on a pending job should be rejected"
        );
    }

    // Progress and records are inspection endpoints, valid in any status.
    let response = get(&app, &format!("/api/v1/jobs/{id}/progress")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = get(&app, &format!("/api/v1/jobs/{id}/records")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Test: records listing validates the action filter
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_records_action_filter_validated(pool: PgPool) {
    let app = build_test_app(pool);
    let id = create_job(&app, "Filters", "customers").await;

    let response = get(&app, &format!("/api/v1/jobs/{id}/records?action=exploded")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&app, &format!("/api/v1/jobs/{id}/records?action=created")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: progress snapshot shape
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_progress_snapshot_shape(pool: PgPool) {
    let app = build_test_app(pool);
    let id = create_job(&app, "Progress", "customers").await;

    let response = get(&app, &format!("/api/v1/jobs/{id}/progress")).await;
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["job_id"].as_i64().unwrap(), id);
    assert_eq!(data["status"], "pending");
    assert_eq!(data["processed_rows"], 0);
    assert_eq!(data["progress_percent"], 0.0);
    assert!(data["started_at"].is_null());
}
