//! Centralized error types for the Warden workspace.

use thiserror::Error;

/// Top-level error enum. Variants map to subsystems.
///
/// Routing misses and listener delivery failures are not errors for
/// authorization callers; they only show up here where a layer below the
/// dispatch boundary needs to report them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WardenError {
    #[error("A scheme policy is already registered for `{subject_scheme}` -> `{object_scheme}`")]
    DuplicateSchemePolicy {
        subject_scheme: String,
        object_scheme: String,
    },

    #[error("Invalid access URI: {0}")]
    InvalidUri(String),

    #[error("Access state invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Listener is dead")]
    DeadObject,

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type WardenResult<T> = Result<T, WardenError>;
