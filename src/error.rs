//! Runtime error types

use thiserror::Error;

/// Result type for all fallible registry and dispatch operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced by the event registry and the class mechanism
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Invalid argument (e.g. `listeners` called without an event name)
    #[error("InvalidArgument: {0}")]
    InvalidArgument(String),

    /// Type error (unknown method, delegation with no base implementation)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Error raised by an application listener or method body
    ///
    /// Propagates synchronously to the caller of `emit`/`call`, aborting
    /// the remainder of the dispatch pass.
    #[error("Exception: {0}")]
    Exception(String),
}

impl RuntimeError {
    /// Create an `InvalidArgument` error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a `TypeError`
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError(message.into())
    }

    /// Create an `Exception` raised from application code
    pub fn exception(message: impl Into<String>) -> Self {
        Self::Exception(message.into())
    }
}
