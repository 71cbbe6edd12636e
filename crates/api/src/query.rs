//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Generic pagination parameters (`?limit=&offset=`).
///
/// Values are clamped in the repository layer via `clamp_limit` /
/// `clamp_offset`.
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query parameters for endpoints returning a bounded row sample
/// (`?limit=`).
#[derive(Debug, Deserialize)]
pub struct SampleParams {
    pub limit: Option<i64>,
}
