//! Listing limits and clamping helpers shared by the repository layer.

/// Default number of results per page for job and record listings.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Maximum number of results per page.
pub const MAX_LIST_LIMIT: i64 = 200;

/// Default number of sample rows returned by the sample endpoint.
pub const DEFAULT_SAMPLE_LIMIT: i64 = 10;

/// Maximum number of sample rows.
pub const MAX_SAMPLE_LIMIT: i64 = 100;

/// Clamp a requested limit into `1..=max`, using `default` when absent.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

/// Clamp a requested offset to be non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}
