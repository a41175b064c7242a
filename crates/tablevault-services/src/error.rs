//! Shared error taxonomy for collaborator calls.

use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failures surfaced by external collaborators. The taxonomy is what the
/// callers branch on: throttling is retried at the transport boundary,
/// not-found and capacity-limit failures are tolerated where the protocol
/// says so, everything else propagates.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transient rate limiting; retried with capped exponential backoff.
    #[error("throttled: {0}")]
    Throttling(String),

    /// The addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An account-level provisioning ceiling was hit.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// The per-day capacity decrease cap was hit.
    #[error("decrease limit exceeded: {0}")]
    DecreaseLimitExceeded(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    pub fn is_throttling(&self) -> bool {
        matches!(self, ServiceError::Throttling(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}
