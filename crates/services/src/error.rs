//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use study_core::model::StudySummaryError;

/// Errors emitted by session services.
///
/// `EmptyDeck` is the one hard failure of the session engine; every other
/// malformed input is handled by clamping rather than erroring so a stale UI
/// event can never crash an in-progress study run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("deck has no cards")]
    EmptyDeck,

    #[error("removal streak threshold must be > 0")]
    InvalidRemovalStreak,

    #[error(transparent)]
    Summary(#[from] StudySummaryError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted when building a circuit breaker configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BreakerConfigError {
    #[error("failure threshold must be > 0")]
    InvalidFailureThreshold,

    #[error("reset timeout must be positive")]
    InvalidResetTimeout,

    #[error("half-open success requirement must be > 0")]
    InvalidHalfOpenSuccesses,
}
