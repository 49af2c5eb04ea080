use crate::server::websocket::BrokerError;

/// Errors surfaced by engagement and notification operations.
#[derive(Debug, thiserror::Error)]
pub enum EngagementError {
    #[error("{0} not found")]
    NotFound(String),

    /// The actor is not allowed to touch the target (e.g. not its owner).
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    InvalidInput(String),

    /// The two sides of a follow edge could not be brought into agreement.
    /// Retryable, but not blindly.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl EngagementError {
    pub fn not_found(what: impl Into<String>) -> Self {
        EngagementError::NotFound(what.into())
    }
}

impl From<BrokerError> for EngagementError {
    fn from(err: BrokerError) -> Self {
        EngagementError::Unavailable(err.to_string())
    }
}

pub type EngagementResult<T> = Result<T, EngagementError>;
