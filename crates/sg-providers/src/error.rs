//! Provider error types.

use thiserror::Error;

/// Errors that can occur in the provider lifecycle and ingestion loops.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Start precondition: a required piece of connection info is blank.
    #[error("required connection info is missing: {0}")]
    MissingConnectionInfo(&'static str),

    #[error("provider is already running")]
    AlreadyRunning,

    #[error("provider has been closed and can not be restarted")]
    Closed,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for provider results.
pub type ProviderResult<T> = Result<T, ProviderError>;
