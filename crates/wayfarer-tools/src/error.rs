//! Error types for wayfarer-tools

use thiserror::Error;

/// Tool error type
#[derive(Debug, Error)]
pub enum Error {
    /// Tool not found
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Integration disabled or misconfigured
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Token acquisition failed
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-2xx reply from an upstream API, body kept for the model to read
    #[error("{service} returned HTTP {status}: {body}")]
    Upstream {
        /// Integration name
        service: String,
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Upstream replied with something we could not parse
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Upstream HTTP status, when the failure came from one
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
