//! Client context.

use crate::config::ClientConfig;
use crate::error::CoreResult;
use crate::file::FileManager;
use crate::secure_store::{MemorySecureStore, SecureStore};
use crate::store::DataStore;
use crate::user::UserService;
use cirrus_transport::{HttpClient, MemorySession, ReqwestClient, SessionProvider, Transport};
use std::sync::Arc;
use tracing::info;

/// Entry point of the SDK.
///
/// A client owns the transport, the session and every service built on
/// them. Create one with [`Client::init`] and end it with
/// [`Client::teardown`]; there is no global state.
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    transport: Transport,
    data: DataStore,
    users: UserService,
}

impl Client {
    /// Creates a client talking to the configured backend over HTTPS.
    ///
    /// The session lives in memory and nothing is persisted.
    pub fn init(config: ClientConfig) -> CoreResult<Self> {
        Self::init_with_secure_store(config, Arc::new(MemorySecureStore::new()))
    }

    /// Creates a client that keeps its session in `secure_store`.
    ///
    /// A session stored by an earlier client is restored on the first
    /// call to [`UserService::current_user`].
    pub fn init_with_secure_store(
        config: ClientConfig,
        secure_store: Arc<dyn SecureStore>,
    ) -> CoreResult<Self> {
        let http = ReqwestClient::new(config.timeout, &config.user_agent)?;
        Ok(Self::with_http_client(
            config,
            Arc::new(http),
            Arc::new(MemorySession::new()),
            secure_store,
        ))
    }

    /// Creates a client from explicit collaborators.
    pub fn with_http_client(
        config: ClientConfig,
        http: Arc<dyn HttpClient>,
        session: Arc<dyn SessionProvider>,
        secure_store: Arc<dyn SecureStore>,
    ) -> Self {
        let transport = Transport::new(config.transport_config(), http, session);
        info!(base_url = %config.base_url, "client initialized");
        Self {
            data: DataStore::new(transport.clone()),
            users: UserService::new(transport.clone(), secure_store),
            transport,
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the transport.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Returns the data store.
    pub fn data(&self) -> &DataStore {
        &self.data
    }

    /// Returns the file manager.
    pub fn files(&self) -> &FileManager {
        self.data.files()
    }

    /// Returns the user service.
    pub fn users(&self) -> &UserService {
        &self.users
    }

    /// Ends the client.
    ///
    /// The in-memory credential is dropped; the secure store is left intact
    /// so the next client can restore the session.
    pub fn teardown(self) {
        self.users.forget();
        info!("client torn down");
    }
}
