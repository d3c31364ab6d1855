//! Matching engine error types.

use thiserror::Error;

/// Errors from matcher collection operations.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("a matcher named '{0}' already exists")]
    DuplicateName(String),

    #[error("no matcher named '{0}'")]
    NotFound(String),

    #[error("the search matcher is always present and can not be removed")]
    SearchReserved,
}

/// Convenience alias for matching results.
pub type MatchResult<T> = Result<T, MatchError>;
