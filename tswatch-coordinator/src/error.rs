//! Coordinator-level failure kinds.

use thiserror::Error;
use tswatch_webquery::QueryError;

/// Why a refresh cycle failed.
///
/// A failed cycle never touches the stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The API key was rejected. Needs operator action; scheduled polling stops.
    #[error("Invalid API key: {0}")]
    AuthFailed(String),

    /// The server was unreachable or answered with an error. Retried on the next tick.
    #[error("Failed to connect to TeamSpeak server: {0}")]
    UpdateFailed(String),
}

impl RefreshError {
    /// Returns true for authentication failures.
    pub fn is_auth(&self) -> bool {
        matches!(self, RefreshError::AuthFailed(_))
    }
}

impl From<QueryError> for RefreshError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Auth(msg) => RefreshError::AuthFailed(msg),
            QueryError::Connect(msg) => RefreshError::UpdateFailed(msg),
        }
    }
}
