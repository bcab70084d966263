//! Error types for the valence council.

use thiserror::Error;

/// Result type alias for council operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring a council or deliberating.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Ballot errors
    #[error("Invalid score from {participant} for {criterion}: {reason}")]
    InvalidScore {
        participant: String,
        criterion: String,
        reason: String,
    },

    #[error("Score collection timed out after {elapsed_ms}ms (limit {limit_ms}ms)")]
    CollectionTimedOut { elapsed_ms: u128, limit_ms: u128 },

    #[error("Deliberation cancelled")]
    Cancelled,

    // Receipt chain errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Receipt chain integrity violated at index {0}")]
    ChainIntegrityViolated(usize),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a ballot rejection.
    pub fn invalid_score(participant: &str, criterion: &str, reason: impl Into<String>) -> Self {
        Error::InvalidScore {
            participant: participant.to_string(),
            criterion: criterion.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
