//! Error types for WebQuery requests.

use thiserror::Error;

/// Status code the server returns for a rejected API key.
pub const INVALID_API_KEY: i64 = 3329;

/// Status codes that mean the credential was rejected.
///
/// Only codes that are known to signal a bad credential belong here; every
/// other non-zero code is reported as a connectivity failure.
const AUTH_CODES: &[i64] = &[INVALID_API_KEY];

/// Returns true if a WebQuery status code signals an authentication failure.
pub fn is_auth_code(code: i64) -> bool {
    AUTH_CODES.contains(&code)
}

/// Errors that can occur when querying a TeamSpeak server.
///
/// Everything that is not a rejected credential collapses into
/// [`QueryError::Connect`]: transport errors, timeouts, non-2xx HTTP
/// statuses, undecodable bodies and non-zero WebQuery status codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The server rejected the API key.
    #[error("Invalid API key: {0}")]
    Auth(String),

    /// The server could not be reached or returned an unusable response.
    #[error("Cannot connect: {0}")]
    Connect(String),
}

impl QueryError {
    /// Returns true for authentication failures.
    pub fn is_auth(&self) -> bool {
        matches!(self, QueryError::Auth(_))
    }

    /// The human-readable detail without the category prefix.
    pub fn detail(&self) -> &str {
        match self {
            QueryError::Auth(msg) | QueryError::Connect(msg) => msg,
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the API key as a query parameter.
        let err = err.without_url();
        if err.is_timeout() {
            QueryError::Connect("Timeout connecting to TeamSpeak server".to_string())
        } else if err.is_decode() {
            QueryError::Connect(format!("Malformed response: {}", err))
        } else {
            QueryError::Connect(format!("Error connecting to TeamSpeak server: {}", err))
        }
    }
}
