//! Root-level health check.

use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

/// Routes mounted at the server root (outside `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
