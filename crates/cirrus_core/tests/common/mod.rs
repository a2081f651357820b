//! Shared setup for integration tests.

#![allow(dead_code)]

use cirrus_core::{Client, ClientConfig, MemorySecureStore, SecureStore};
use cirrus_testkit::{MockBackend, MOCK_APP_KEY};
use cirrus_transport::MemorySession;
use std::sync::Arc;

/// A client wired to an in-memory backend.
pub struct Harness {
    pub backend: Arc<MockBackend>,
    pub store: Arc<MemorySecureStore>,
    pub client: Client,
}

pub fn harness() -> Harness {
    harness_with(MockBackend::new())
}

pub fn harness_with(backend: MockBackend) -> Harness {
    let backend = Arc::new(backend);
    let store = Arc::new(MemorySecureStore::new());
    let client = client_for(&backend, store.clone());
    Harness {
        backend,
        store,
        client,
    }
}

pub fn client_for(backend: &Arc<MockBackend>, store: Arc<dyn SecureStore>) -> Client {
    Client::with_http_client(
        ClientConfig::new(MOCK_APP_KEY).with_base_url(backend.base_url()),
        backend.clone(),
        Arc::new(MemorySession::new()),
        store,
    )
}
