//! JSON-over-HTTP transport.

use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method};
use crate::multipart::{MultipartBody, Part};
use crate::session::SessionProvider;
use crate::template;
use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, trace};

const JSON: &str = "application/json";

/// Sends requests to the backend.
///
/// The transport resolves URL templates against the configured base URL,
/// attaches the application key and (when one is present) the session
/// credential, and normalizes every failure into a [`TransportError`].
/// It never retries.
#[derive(Clone)]
pub struct Transport {
    config: TransportConfig,
    http: Arc<dyn HttpClient>,
    session: Arc<dyn SessionProvider>,
}

impl Transport {
    /// Creates a transport.
    pub fn new(
        config: TransportConfig,
        http: Arc<dyn HttpClient>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            config,
            http,
            session,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Returns the base URL (ending in `/`).
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Returns the session provider.
    pub fn session(&self) -> &Arc<dyn SessionProvider> {
        &self.session
    }

    /// Expands a template into an absolute URL.
    pub fn url(&self, template: &str, params: &[(&str, &str)]) -> TransportResult<String> {
        let path = template::expand(template, params)?;
        Ok(format!("{}{}", self.config.base_url, path))
    }

    /// Sends a JSON request to a templated URL.
    ///
    /// An empty response body decodes to `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        template: &str,
        params: &[(&str, &str)],
        body: Option<&Value>,
    ) -> TransportResult<Value> {
        let url = self.url(template, params)?;
        self.request_url(method, &url, body).await
    }

    /// Sends a JSON request to an absolute URL.
    pub async fn request_url(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> TransportResult<Value> {
        let mut headers = self.base_headers(JSON);
        let body = match body {
            Some(value) => {
                headers.push(("Content-Type".to_string(), JSON.to_string()));
                trace!(body = %value, "request body");
                Bytes::from(value.to_string())
            }
            None => Bytes::new(),
        };

        let response = self
            .send(HttpRequest {
                method,
                url: url.to_string(),
                headers,
                body,
            })
            .await?;
        decode_json(&response.body)
    }

    /// Posts `multipart/form-data` to a templated URL and decodes the JSON
    /// response.
    pub async fn post_multipart(
        &self,
        template: &str,
        params: &[(&str, &str)],
        parts: &[Part],
    ) -> TransportResult<Value> {
        let url = self.url(template, params)?;
        let multipart = MultipartBody::encode(parts);

        let mut headers = self.base_headers(JSON);
        headers.push(("Content-Type".to_string(), multipart.content_type()));
        debug!(url = %url, parts = parts.len(), "multipart upload");

        let response = self
            .send(HttpRequest {
                method: Method::Post,
                url,
                headers,
                body: multipart.into_body(),
            })
            .await?;
        decode_json(&response.body)
    }

    /// Fetches raw bytes from an absolute URL.
    pub async fn get_bytes(&self, url: &str) -> TransportResult<Bytes> {
        let headers = self.base_headers("*/*");
        let response = self
            .send(HttpRequest {
                method: Method::Get,
                url: url.to_string(),
                headers,
                body: Bytes::new(),
            })
            .await?;
        Ok(response.body)
    }

    fn base_headers(&self, accept: &str) -> Vec<(String, String)> {
        let mut headers = vec![
            (self.config.app_key_header.clone(), self.config.app_key.clone()),
            ("Accept".to_string(), accept.to_string()),
        ];
        if let Some(token) = self.session.current_credential() {
            headers.push((self.config.session_header.clone(), token));
        }
        headers
    }

    async fn send(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        let method = request.method;
        let url = request.url.clone();
        debug!(
            %method,
            url = %url,
            authenticated = request.header(&self.config.session_header).is_some(),
            "sending request"
        );

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(%method, url = %url, error = %e, "request failed");
                return Err(e);
            }
        };

        debug!(%method, url = %url, status = response.status, "received response");
        if response.is_success() {
            trace!(bytes = response.body.len(), "response body");
            return Ok(response);
        }

        let message = error_message(&response.body);
        error!(%method, url = %url, status = response.status, message = %message, "server rejected request");
        Err(TransportError::api(response.status, message))
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.config.base_url)
            .field("authenticated", &self.session.current_credential().is_some())
            .finish()
    }
}

fn decode_json(body: &[u8]) -> TransportResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| TransportError::decode(e.to_string()))
}

/// Extracts `errorMessage` from an error body, or an empty string.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("errorMessage")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_default()
}
