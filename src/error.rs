//! Error types for the device core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoDevError {
    /// Operation is not legal in the device's current state.
    #[error("Invalid device state: {0}")]
    InvalidState(String),

    /// The backend does not implement a capability the operation needs.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure reported by the backend, propagated unchanged.
    #[error("Backend failure: {0}")]
    Backend(String),

    /// The backend handed out a larger window than was requested.
    #[error("Backend returned {returned} frames, more than the {requested} requested")]
    OverrunFromBackend { requested: usize, returned: usize },

    /// The hardware buffer ran dry.
    #[error("Underrun: no frames queued")]
    Underrun,

    #[error("Monitor error: {0}")]
    Monitor(String),
}

pub type Result<T> = std::result::Result<T, IoDevError>;
