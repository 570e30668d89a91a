//! Container runtime error types.

use thiserror::Error;

/// Result type for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Errors that can occur during container operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The container command ran and exited unsuccessfully.
    #[error("container {command} failed: {message}")]
    CommandFailed { command: String, message: String },

    /// The runtime binary could not be executed at all.
    #[error("container runtime '{binary}' unavailable: {message}")]
    RuntimeUnavailable { binary: String, message: String },

    /// Container was not found.
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ContainerError {
    /// Whether the failure came from the runtime being unreachable rather
    /// than from the command itself.
    pub fn is_runtime_unavailable(&self) -> bool {
        matches!(self, ContainerError::RuntimeUnavailable { .. })
    }
}
