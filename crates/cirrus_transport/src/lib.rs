//! # Cirrus Transport
//!
//! JSON-over-HTTP transport for the Cirrus SDK.
//!
//! This crate provides:
//! - URL templates with `:name` placeholders and percent-encoding
//! - JSON requests (GET/POST/PUT/DELETE) and `multipart/form-data` uploads
//! - Session credential injection through a [`SessionProvider`]
//! - Error normalization into [`TransportError`]
//! - An [`HttpClient`] seam with a `reqwest` implementation
//!
//! ## Errors
//!
//! A non-2xx status becomes [`TransportError::Api`] carrying the server's
//! `errorMessage`, a malformed body becomes [`TransportError::Decode`], and
//! connectivity failures become [`TransportError::Network`]. Nothing is
//! retried here; retry policy belongs to the caller.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod multipart;
mod session;
pub mod template;
mod transport;

pub use config::{
    normalize_base_url, TransportConfig, APP_KEY_HEADER, DEFAULT_BASE_URL, SESSION_HEADER,
};
pub use error::{TransportError, TransportResult};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, ReqwestClient};
pub use multipart::{MultipartBody, Part};
pub use session::{MemorySession, SessionProvider};
pub use transport::Transport;

/// Re-exported so implementors of [`HttpClient`] need no direct dependency.
pub use async_trait::async_trait;
