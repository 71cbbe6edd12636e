/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// JSON object shorthand used for source rows and transformed records.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Derived progress percentage, clamped to `0.0..=100.0`.
///
/// A job with `total_rows == 0` reports 0% rather than dividing by zero.
pub fn progress_percent(processed_rows: i32, total_rows: i32) -> f64 {
    if total_rows <= 0 {
        return 0.0;
    }
    (processed_rows as f64 / total_rows as f64 * 100.0).clamp(0.0, 100.0)
}
