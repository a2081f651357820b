//! Users and sessions.

use crate::error::{CoreError, CoreResult};
use crate::file::FileManager;
use crate::record::{Record, USERNAME_PROPERTY, USERS_COLLECTION};
use crate::secure_store::{SecureStore, SESSION_ID_KEY, USERNAME_KEY, USER_ID_KEY};
use crate::value::PropertyValue;
use cirrus_transport::{Method, Transport};
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// A user: a record in the `users` collection.
///
/// The username is assigned at signup and cannot be changed through
/// [`User::set`].
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    username: String,
    record: Record,
}

impl User {
    /// Returns the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the user's record identifier.
    pub fn id(&self) -> Option<&str> {
        self.record.id()
    }

    /// Returns a property value.
    pub fn get(&self, property: &str) -> Option<&PropertyValue> {
        self.record.get(property)
    }

    /// Sets a property.
    pub fn set(&mut self, property: impl Into<String>, value: impl Into<PropertyValue>) -> CoreResult<()> {
        self.record.set(property, value)
    }

    /// Returns the underlying record.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Returns the underlying record for saving or refreshing.
    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    /// Consumes the user, returning its record.
    pub fn into_record(self) -> Record {
        self.record
    }

    fn from_server(value: &Value, fallback_username: &str, files: &FileManager) -> CoreResult<Self> {
        let record = Record::from_server(USERS_COLLECTION, value, files)?;
        let username = value
            .get(USERNAME_PROPERTY)
            .and_then(Value::as_str)
            .unwrap_or(fallback_username)
            .to_string();
        Ok(Self { username, record })
    }
}

/// Signup, login and session persistence.
///
/// The logged-in user is kept in memory and mirrored to the secure store
/// (`Username`, `UserObjectID`, `SessionID`) so a later client can restore
/// the session.
pub struct UserService {
    transport: Transport,
    files: FileManager,
    secure_store: Arc<dyn SecureStore>,
    current: RwLock<Option<User>>,
}

impl UserService {
    /// Creates a user service.
    pub fn new(transport: Transport, secure_store: Arc<dyn SecureStore>) -> Self {
        Self {
            files: FileManager::new(transport.clone()),
            transport,
            secure_store,
            current: RwLock::new(None),
        }
    }

    /// Registers a user.
    ///
    /// With `login` the new session becomes current; without it the server
    /// is asked not to open a session.
    pub async fn signup(
        &self,
        username: &str,
        password: &str,
        properties: Map<String, Value>,
        login: bool,
    ) -> CoreResult<User> {
        let mut body = properties;
        body.insert(USERNAME_PROPERTY.to_string(), json!(username));
        body.insert("sysPassword".to_string(), json!(password));

        let template = if login { "users" } else { "users?login=false" };
        let response = self
            .transport
            .request(Method::Post, template, &[], Some(&Value::Object(body)))
            .await?;
        info!(username, login, "signed up");

        if login {
            return self.establish_session(&response, username);
        }
        let user_json = response.get("user").unwrap_or(&response);
        User::from_server(user_json, username, &self.files)
    }

    /// Opens a session.
    pub async fn login(&self, username: &str, password: &str) -> CoreResult<User> {
        let body = json!({
            "sysUsername": username,
            "sysPassword": password,
        });
        let response = self
            .transport
            .request(Method::Post, "sessions", &[], Some(&body))
            .await?;
        info!(username, "logged in");
        self.establish_session(&response, username)
    }

    /// Returns the logged-in user, restoring it from the secure store if
    /// this service has not seen a login yet.
    pub fn current_user(&self) -> Option<User> {
        let current = self.current.read().clone();
        if current.is_some() {
            return current;
        }
        let user = self.restore()?;
        *self.current.write() = Some(user.clone());
        Some(user)
    }

    /// Ends the session.
    ///
    /// The server-side session is deleted on a best-effort basis; local
    /// state is cleared even if that request fails.
    pub async fn logout(&self) -> CoreResult<()> {
        let session_id = self
            .transport
            .session()
            .current_credential()
            .ok_or(CoreError::NotLoggedIn)?;

        if let Err(e) = self
            .transport
            .request(
                Method::Delete,
                "sessions/:id",
                &[("id", session_id.as_str())],
                None,
            )
            .await
        {
            warn!(error = %e, "failed to delete server session");
        }

        if let Err(e) = self.secure_store.clear() {
            warn!(error = %e, "failed to clear stored session");
        }
        self.transport.session().set_credential(None);
        *self.current.write() = None;
        info!("logged out");
        Ok(())
    }

    /// Asks the server to email a password reset code.
    pub async fn request_password_reset(&self, email: &str) -> CoreResult<()> {
        self.transport
            .request(
                Method::Post,
                "users/reset/email",
                &[],
                Some(&json!({ "email": email })),
            )
            .await?;
        Ok(())
    }

    /// Sets a new password using a reset code.
    ///
    /// With `login` the response opens a session and the user is returned.
    pub async fn change_password(
        &self,
        username: &str,
        password: &str,
        pin_code: &str,
        login: bool,
    ) -> CoreResult<Option<User>> {
        let body = json!({
            "username": username,
            "password": password,
            "pinCode": pin_code,
            "login": login,
        });
        let response = self
            .transport
            .request(Method::Post, "users/reset/password", &[], Some(&body))
            .await?;
        if login {
            return self.establish_session(&response, username).map(Some);
        }
        Ok(None)
    }

    /// Drops the in-memory user and credential, keeping the secure store.
    pub(crate) fn forget(&self) {
        *self.current.write() = None;
        self.transport.session().set_credential(None);
    }

    fn establish_session(&self, response: &Value, username: &str) -> CoreResult<User> {
        let session_id = response
            .get("sysSessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::unexpected_response("login response without sysSessionId"))?;
        let user_json = response
            .get("user")
            .ok_or_else(|| CoreError::unexpected_response("login response without user"))?;
        let user = User::from_server(user_json, username, &self.files)?;

        self.transport
            .session()
            .set_credential(Some(session_id.to_string()));
        self.persist(&user, session_id);
        *self.current.write() = Some(user.clone());
        Ok(user)
    }

    fn persist(&self, user: &User, session_id: &str) {
        let id = user.id().unwrap_or_default();
        let result = self
            .secure_store
            .set(USERNAME_KEY, user.username())
            .and_then(|_| self.secure_store.set(USER_ID_KEY, id))
            .and_then(|_| self.secure_store.set(SESSION_ID_KEY, session_id));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist session");
        }
    }

    fn restore(&self) -> Option<User> {
        let username = self.secure_store.get(USERNAME_KEY)?;
        let id = self.secure_store.get(USER_ID_KEY)?;
        let session_id = self.secure_store.get(SESSION_ID_KEY)?;

        let value = json!({ "sysObjectId": id, "sysUsername": username });
        let user = User::from_server(&value, &username, &self.files).ok()?;
        self.transport.session().set_credential(Some(session_id));
        info!(username = %username, "restored previous session");
        Some(user)
    }
}

impl fmt::Debug for UserService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserService")
            .field("current", &self.current.read().as_ref().map(User::username))
            .finish()
    }
}
