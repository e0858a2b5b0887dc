//! Backend call errors.

use thiserror::Error;

/// Errors raised while talking to the backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The HTTP client could not be constructed.
    #[error("failed to build backend client: {0}")]
    Client(#[source] reqwest::Error),

    /// The configured origin or a derived target URL is invalid.
    #[error("invalid backend target: {0}")]
    InvalidTarget(#[from] url::ParseError),

    /// A multipart part could not be encoded.
    #[error("invalid form part '{name}': {source}")]
    InvalidPart {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    /// Connect or read deadline exceeded.
    #[error("backend timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// Connection refused, DNS failure, reset, or unreadable response.
    #[error("backend unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The whole exchange, retry and fallback included, ran out of time.
    #[error("backend did not answer within {0:?}")]
    Deadline(std::time::Duration),

    /// The connection limiter was shut down.
    #[error("backend connection pool closed")]
    PoolClosed,
}

impl ForwardError {
    /// Classify a transport-level client error.
    pub fn transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ForwardError::Timeout(error)
        } else {
            ForwardError::Unreachable(error)
        }
    }

    /// True when the backend could not be reached at the transport level.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ForwardError::Timeout(_) | ForwardError::Unreachable(_))
    }
}
