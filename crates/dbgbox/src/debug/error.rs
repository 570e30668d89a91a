//! Debug resolution error types.

use thiserror::Error;

/// Result type for debug resolution.
pub type DebugResult<T> = Result<T, DebugError>;

/// Errors raised while resolving a debug request.
#[derive(Debug, Error)]
pub enum DebugError {
    #[error("To debug with Docker you must first open a folder or workspace.")]
    NoWorkspace,

    #[error("The property \"request\" must be specified in the debug config.")]
    MissingRequestKind,

    #[error("The platform '{0}' is not currently supported for Docker debugging.")]
    UnsupportedPlatform(String),

    #[error("No debug type was resolved.")]
    MissingType,

    #[error("No debug request was resolved.")]
    MissingRequest,

    #[error("looking up the associated run task failed: {0:#}")]
    TaskLookup(anyhow::Error),

    /// Raised by a platform helper.
    #[error(transparent)]
    Resolver(#[from] anyhow::Error),
}

impl DebugError {
    /// Stable identifier used in error reports.
    pub fn code(&self) -> &'static str {
        match self {
            DebugError::NoWorkspace => "NO_WORKSPACE",
            DebugError::MissingRequestKind => "MISSING_REQUEST_KIND",
            DebugError::UnsupportedPlatform(_) => "UNSUPPORTED_PLATFORM",
            DebugError::MissingType => "MISSING_TYPE",
            DebugError::MissingRequest => "MISSING_REQUEST",
            DebugError::TaskLookup(_) => "TASK_LOOKUP",
            DebugError::Resolver(_) => "RESOLVER",
        }
    }
}
