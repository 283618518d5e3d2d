//! Simulator failures.

use thiserror::Error;

/// Why a simulator operation failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimulatorError {
    /// The listener could not be bound.
    #[error("failed to bind Runtime API listener: {0}")]
    BindError(String),

    /// The server could not be started or stopped serving.
    #[error("Runtime API server failed: {0}")]
    ServerStart(String),

    /// A wait helper gave up.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The request id was never enqueued.
    #[error("no invocation with request id {0}")]
    InvocationNotFound(String),
}

/// Shorthand for simulator results.
pub type SimulatorResult<T> = Result<T, SimulatorError>;
