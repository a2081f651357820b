//! Error types for the transport layer.

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur while talking to the backend.
///
/// Every variant is terminal for the request that produced it; the
/// transport never retries on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection failure or timeout.
    #[error("network error: {message}")]
    Network {
        /// Error message.
        message: String,
    },

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The server's `errorMessage`, empty if none was sent.
        message: String,
    },

    /// The response body was not valid JSON.
    #[error("failed to decode response: {message}")]
    Decode {
        /// Error message.
        message: String,
    },

    /// A placeholder in a URL template had no value.
    #[error("unresolved placeholder `:{placeholder}` in URL template `{template}`")]
    InvalidUrlTemplate {
        /// The template being expanded.
        template: String,
        /// Name of the missing placeholder.
        placeholder: String,
    },

    /// The final URL could not be used by the HTTP client.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
    },
}

impl TransportError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns true if the caller may retry the request.
    ///
    /// Only connectivity failures are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Network { .. })
    }

    /// Returns the HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
