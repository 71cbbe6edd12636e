//! HTTP-level integration tests for the entity catalog endpoints.
//!
//! Uses Axum's `tower::ServiceExt` to send requests directly to the
//! router. The catalog is the built-in registry, so these tests run
//! against realistic schemas.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Test: GET /api/v1/entities lists the registry
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_entities(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(&app, "/api/v1/entities").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let data = json["data"].as_array().expect("data should be an array");
    assert_eq!(data.len(), 5);
    assert!(
        data.iter().any(|e| e["entity_type"] == "customers"),
        "should include customers"
    );

    let customers = data
        .iter()
        .find(|e| e["entity_type"] == "customers")
        .unwrap();
    assert_eq!(customers["unique_fields"], serde_json::json!(["email"]));
    assert_eq!(
        customers["required_fields"],
        serde_json::json!(["name", "email"])
    );
}

// ---------------------------------------------------------------------------
// Test: GET /api/v1/migration-order places dependencies first
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_migration_order_respects_dependencies(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(&app, "/api/v1/migration-order").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let order: Vec<String> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();

    let position = |t: &str| order.iter().position(|o| o == t).unwrap();
    assert!(position("customers") < position("contacts"));
    assert!(position("customers") < position("orders"));
    assert!(position("products") < position("orders"));
    assert!(position("orders") < position("payments"));
}

// ---------------------------------------------------------------------------
// Test: GET /api/v1/entities/{type}/schema returns field details
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_entity_schema(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(&app, "/api/v1/entities/customers/schema").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let fields = json["data"]["fields"].as_array().unwrap();
    let email = fields.iter().find(|f| f["name"] == "email").unwrap();
    assert_eq!(email["field_type"], "string");
    assert_eq!(email["required"], true);
    assert_eq!(email["unique"], true);

    let status = fields.iter().find(|f| f["name"] == "status").unwrap();
    assert_eq!(status["field_type"], "enum");
    assert!(status["enum_values"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("active")));
}

// ---------------------------------------------------------------------------
// Test: GET /api/v1/entities/{type}/dependencies is direct-only
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_entity_dependencies_direct_only(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(&app, "/api/v1/entities/payments/dependencies").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let deps = json["data"].as_array().unwrap();
    // payments depends on orders directly; customers only transitively.
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0]["entity_type"], "orders");
}

// ---------------------------------------------------------------------------
// Test: unknown entity type yields 404 with a typed code
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_entity_type(pool: PgPool) {
    let app = build_test_app(pool);

    let response = get(&app, "/api/v1/entities/widgets/schema").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNKNOWN_ENTITY_TYPE");

    let response = get(&app, "/api/v1/entities/widgets/dependencies").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: health endpoint
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_health(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}
