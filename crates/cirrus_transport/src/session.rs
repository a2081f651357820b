//! Session credential provider.

use parking_lot::RwLock;

/// Supplies the credential attached to outgoing requests.
///
/// The transport asks for the credential on every request and never
/// caches it, so a login or logout takes effect immediately.
pub trait SessionProvider: Send + Sync {
    /// Returns the current session token, if any.
    fn current_credential(&self) -> Option<String>;

    /// Replaces the session token; `None` logs out.
    fn set_credential(&self, token: Option<String>);
}

/// In-memory session provider.
#[derive(Debug, Default)]
pub struct MemorySession {
    token: RwLock<Option<String>>,
}

impl MemorySession {
    /// Creates a provider without a credential.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider holding the given token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl SessionProvider for MemorySession {
    fn current_credential(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set_credential(&self, token: Option<String>) {
        *self.token.write() = token;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_without_credential() {
        let session = MemorySession::new();
        assert_eq!(session.current_credential(), None);
    }

    #[test]
    fn login_and_logout() {
        let session = MemorySession::new();
        session.set_credential(Some("s1".into()));
        assert_eq!(session.current_credential().as_deref(), Some("s1"));
        session.set_credential(None);
        assert_eq!(session.current_credential(), None);
    }

    #[test]
    fn with_token() {
        let session = MemorySession::with_token("abc");
        assert_eq!(session.current_credential().as_deref(), Some("abc"));
    }
}
