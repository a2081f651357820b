//! Configuration for the transport.

/// Default backend root.
pub const DEFAULT_BASE_URL: &str = "https://api.cirrus.dev/v1/";

/// Header carrying the application key.
pub const APP_KEY_HEADER: &str = "x-cirrus-appkey";

/// Header carrying the session credential.
pub const SESSION_HEADER: &str = "x-cirrus-sessionid";

/// Configuration for [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Root URL that templates are resolved against. Always ends in `/`.
    pub base_url: String,
    /// Application key sent with every request.
    pub app_key: String,
    /// Header name for the application key.
    pub app_key_header: String,
    /// Header name for the session credential.
    pub session_header: String,
}

impl TransportConfig {
    /// Creates a configuration for the default backend.
    pub fn new(app_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_key: app_key.into(),
            app_key_header: APP_KEY_HEADER.to_string(),
            session_header: SESSION_HEADER.to_string(),
        }
    }

    /// Sets the base URL, appending a trailing `/` if missing.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url.into());
        self
    }

    /// Sets the application key header name.
    pub fn with_app_key_header(mut self, name: impl Into<String>) -> Self {
        self.app_key_header = name.into();
        self
    }

    /// Sets the session header name.
    pub fn with_session_header(mut self, name: impl Into<String>) -> Self {
        self.session_header = name.into();
        self
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// Ensures a base URL ends in exactly one `/`.
pub fn normalize_base_url(mut url: String) -> String {
    while url.ends_with("//") {
        url.pop();
    }
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TransportConfig::new("key");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.app_key, "key");
        assert_eq!(config.app_key_header, "x-cirrus-appkey");
        assert_eq!(config.session_header, "x-cirrus-sessionid");
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let config = TransportConfig::new("k").with_base_url("http://localhost:3000/api");
        assert_eq!(config.base_url, "http://localhost:3000/api/");

        let config = TransportConfig::new("k").with_base_url("http://localhost/api//");
        assert_eq!(config.base_url, "http://localhost/api/");
    }

    #[test]
    fn header_overrides() {
        let config = TransportConfig::new("k")
            .with_app_key_header("x-app")
            .with_session_header("x-session");
        assert_eq!(config.app_key_header, "x-app");
        assert_eq!(config.session_header, "x-session");
    }
}
