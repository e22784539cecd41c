//! Error types for pipelines.

use crate::schema::Operation;
use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The pipeline does not implement this operation.
    #[error("Operation '{0}' is not supported by this pipeline")]
    Unsupported(Operation),

    /// Input rejected by the pipeline itself (after transport-side schema validation).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The addressed resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The write would violate a uniqueness constraint.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Declared schemas are malformed.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Anything else (storage failures, bugs).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
