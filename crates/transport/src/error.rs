use serde_json::Value;

/// Errors surfaced by a [`Transport`](crate::Transport).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("Request failed with status {status}")]
    Http {
        status: u16,
        /// Parsed response body (string for non-JSON, null for empty).
        data: Value,
    },

    /// Rejected locally by the rate limiter before any network I/O.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The request could not be built (bad method, bad header, bad part).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Response body, when the server answered.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Http { data, .. } => Some(data),
            _ => None,
        }
    }
}
