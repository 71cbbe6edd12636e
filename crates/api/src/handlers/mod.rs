//! Request handlers, one submodule per resource area.
//!
//! Handlers delegate to the repositories in `portage_db` and the pure
//! logic in `portage_core`, and map errors via [`crate::error::AppError`].

pub mod entities;
pub mod execution;
pub mod jobs;
pub mod mapping;
pub mod rollback;
pub mod upload;
pub mod validation;
