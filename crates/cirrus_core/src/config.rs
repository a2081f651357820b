//! Client configuration.

use crate::error::{CoreError, CoreResult};
use cirrus_transport::{normalize_base_url, TransportConfig, DEFAULT_BASE_URL};
use std::time::Duration;

/// Environment variable holding the application key.
pub const ENV_APP_KEY: &str = "CIRRUS_APP_KEY";
/// Environment variable overriding the base URL.
pub const ENV_BASE_URL: &str = "CIRRUS_BASE_URL";
/// Environment variable overriding the request timeout, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "CIRRUS_TIMEOUT_SECS";

/// Configuration for a [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Application key sent with every request.
    pub app_key: String,

    /// Backend root URL. Always ends in `/`.
    pub base_url: String,

    /// Per-request timeout applied by the HTTP client.
    pub timeout: Duration,

    /// `User-Agent` header value.
    pub user_agent: String,
}

impl ClientConfig {
    /// Creates a configuration for the default backend.
    #[must_use]
    pub fn new(app_key: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("cirrus/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Reads the configuration from `CIRRUS_*` environment variables.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_key = lookup(ENV_APP_KEY)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CoreError::invalid_config(format!("{} is not set", ENV_APP_KEY)))?;
        let mut config = Self::new(app_key);

        if let Some(url) = lookup(ENV_BASE_URL).filter(|url| !url.trim().is_empty()) {
            config = config.with_base_url(url);
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                CoreError::invalid_config(format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Sets the base URL, appending a trailing `/` if missing.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the transport settings derived from this configuration.
    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::new(self.app_key.clone()).with_base_url(self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let config = ClientConfig::new("key");
        assert_eq!(config.base_url, "https://api.cirrus.dev/v1/");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("cirrus/"));
    }

    #[test]
    fn builder_pattern() {
        let config = ClientConfig::new("key")
            .with_base_url("http://localhost:3000")
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("tests");

        assert_eq!(config.base_url, "http://localhost:3000/");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "tests");

        let transport = config.transport_config();
        assert_eq!(transport.app_key, "key");
        assert_eq!(transport.base_url, "http://localhost:3000/");
    }

    #[test]
    fn from_lookup_reads_all_variables() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_APP_KEY, "abc"),
            (ENV_BASE_URL, "http://h/api"),
            (ENV_TIMEOUT_SECS, "12"),
        ]))
        .unwrap();
        assert_eq!(config.app_key, "abc");
        assert_eq!(config.base_url, "http://h/api/");
        assert_eq!(config.timeout, Duration::from_secs(12));
    }

    #[test]
    fn from_lookup_requires_app_key() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));

        let err = ClientConfig::from_lookup(lookup(&[(ENV_APP_KEY, "  ")])).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }

    #[test]
    fn from_lookup_rejects_bad_timeout() {
        let err = ClientConfig::from_lookup(lookup(&[
            (ENV_APP_KEY, "abc"),
            (ENV_TIMEOUT_SECS, "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT_SECS));
    }
}
