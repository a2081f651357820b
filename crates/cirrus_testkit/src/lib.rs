//! # Cirrus Testkit
//!
//! Test utilities for the Cirrus SDK.
//!
//! This crate provides:
//! - [`MockBackend`], an in-memory backend implementing the REST protocol
//!   behind the [`cirrus_transport::HttpClient`] seam
//! - Request recording and failure injection for asserting on the wire
//! - An evaluator for the filter grammar and a multipart parser
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cirrus_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn creates_notes() {
//!     let backend = Arc::new(MockBackend::new());
//!     let (transport, _session) = mock_transport(&backend);
//!     // ... drive the transport, then inspect `backend.requests()`
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod filter;
pub mod fixtures;
pub mod generators;
pub mod multipart;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use std::sync::Arc;
}

pub use backend::{MockBackend, RecordedRequest, StoredFile, MOCK_APP_KEY, MOCK_BASE_URL, RESET_PIN};
pub use filter::{CompareOp, Filter};
pub use fixtures::*;
pub use generators::*;
pub use multipart::ParsedPart;
