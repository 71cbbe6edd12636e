//! Domain error type shared across the workspace.
//!
//! Core logic and repositories return [`CoreError`]; the HTTP status and
//! response-body mapping lives in the API crate so it stays in one place.

use crate::types::DbId;

/// Domain-level error for the migration pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An entity row was not found by ID.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// The requested entity type is not registered in the catalog.
    #[error("Unknown entity type '{0}'")]
    UnknownEntityType(String),

    /// The catalog's dependency graph contains a cycle. Raised at
    /// catalog load time, never per request.
    #[error("Entity dependency cycle involving: {0}")]
    CyclicDependency(String),

    /// A saved mapping leaves required fields without a mapped column
    /// or a default value.
    #[error("Mapping is missing required fields: {}", missing.join(", "))]
    IncompleteMapping { missing: Vec<String> },

    /// An operation was called on a job whose status does not allow it.
    #[error("Cannot {operation} a job in status '{status}'")]
    InvalidState {
        operation: &'static str,
        status: String,
    },

    /// A request failed input validation.
    #[error("{0}")]
    Validation(String),

    /// The request conflicts with current resource state.
    #[error("{0}")]
    Conflict(String),

    /// An unexpected internal failure.
    #[error("{0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for [`CoreError::InvalidState`].
    pub fn invalid_state(operation: &'static str, status: impl Into<String>) -> Self {
        Self::InvalidState {
            operation,
            status: status.into(),
        }
    }
}
