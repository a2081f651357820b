//! Test fixtures.

use crate::backend::{MockBackend, MOCK_APP_KEY};
use cirrus_transport::{MemorySession, Transport, TransportConfig};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Builds a transport wired to `backend` with a fresh in-memory session.
///
/// The session is returned as well so tests can log in or out directly.
pub fn mock_transport(backend: &Arc<MockBackend>) -> (Transport, Arc<MemorySession>) {
    let session = Arc::new(MemorySession::new());
    let transport = Transport::new(
        TransportConfig::new(MOCK_APP_KEY).with_base_url(backend.base_url()),
        backend.clone(),
        session.clone(),
    );
    (transport, session)
}

/// Unwraps a JSON object.
///
/// # Panics
///
/// Panics if `value` is not an object.
pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}
