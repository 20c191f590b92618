//! Error types for the relay.

use std::time::Duration;

/// Top-level error type for the relay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Submission validation errors. Surfaced synchronously from `submit_tasks`;
/// when any entry fails validation, no task is created.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("task[{index}]: missing required field {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("task[{index}]: {field} must be an absolute path, got {path}")]
    RelativePath {
        index: usize,
        field: &'static str,
        path: String,
    },
}

/// Errors from the text-generation engine. The variants keep the failure
/// kinds distinguishable in task error messages: connection, HTTP status,
/// missing model, deadline, cancellation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine connection failed ({url}): {reason}")]
    Connection { url: String, reason: String },

    #[error("engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model {model} not found")]
    ModelNotFound { model: String },

    #[error("engine call timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("engine call cancelled")]
    Cancelled,

    #[error("invalid engine response: {reason}")]
    InvalidResponse { reason: String },
}

/// Worker-pool errors.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("worker pool is shutting down; no new tasks accepted")]
    ShuttingDown,
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;
