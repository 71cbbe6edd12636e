//! Row models and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for the writes that resource supports

pub mod migration_job;
pub mod migration_record;
pub mod target_record;
