//! Error types for Cirrus core.

use cirrus_query::QueryError;
use cirrus_transport::TransportError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Cirrus core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The request failed in the transport layer.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A query could not be built.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Reading a local file attachment failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The property is managed by the backend and cannot be set.
    #[error("property `{property}` is read-only")]
    ReadOnlyProperty {
        /// Name of the property.
        property: String,
    },

    /// The record was deleted and can no longer be used.
    #[error("record in collection `{collection}` has been deleted")]
    StaleRecord {
        /// Collection of the record.
        collection: String,
    },

    /// The record has never been saved, so it has no identifier.
    #[error("record in collection `{collection}` has no identifier")]
    MissingIdentifier {
        /// Collection of the record.
        collection: String,
    },

    /// The file has no remote URL yet.
    #[error("file `{filename}` has not been uploaded")]
    NotUploaded {
        /// Name of the file.
        filename: String,
    },

    /// The file has neither an in-memory buffer nor a local path.
    #[error("file `{filename}` has no local data to upload")]
    NoLocalData {
        /// Name of the file.
        filename: String,
    },

    /// A relation refers to records that have not been saved yet.
    #[error("property `{property}` refers to unsaved records; save them first or use save_all")]
    UnsavedRelated {
        /// Name of the relation property.
        property: String,
    },

    /// The property does not hold a relation.
    #[error("property `{property}` is not a relation")]
    NotARelation {
        /// Name of the property.
        property: String,
    },

    /// The operation requires a logged-in user.
    #[error("no user is logged in")]
    NotLoggedIn,

    /// A successful response lacked something the client needs.
    #[error("unexpected response: {message}")]
    UnexpectedResponse {
        /// What was wrong with the response.
        message: String,
    },

    /// A batch save stopped at a failing record.
    #[error("batch save aborted at record {index}: {source}")]
    BatchAborted {
        /// Position of the failing record.
        index: usize,
        /// Why that record failed.
        #[source]
        source: Box<CoreError>,
    },

    /// The client configuration is incomplete or malformed.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates an unexpected response error.
    pub fn unexpected_response(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true if retrying the same call may succeed.
    ///
    /// Only connectivity failures are transient. Nothing in this crate
    /// retries automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Transport(e) => e.is_retryable(),
            CoreError::BatchAborted { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns the HTTP status for errors the server reported.
    pub fn status(&self) -> Option<u16> {
        match self {
            CoreError::Transport(e) => e.status(),
            CoreError::BatchAborted { source, .. } => source.status(),
            _ => None,
        }
    }
}
