//! Thin HTTP client for the hosted backend-as-a-service.
//!
//! The backend exposes three sub-APIs under one base URL: a PostgREST-style
//! record API (`/rest/v1`), object storage (`/storage/v1`) and identity
//! (`/auth/v1`). Every request carries the public API key; the bearer token is
//! either the caller's access token (see [`Backend::scoped`]) or the key itself.

pub mod identity;
pub mod records;

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde_json::Value;

#[derive(Debug)]
pub enum BackendError {
    /// Missing or malformed client configuration. Raised at construction.
    Config(String),
    /// Transport failure: connect, timeout, TLS.
    Network(reqwest::Error),
    /// The backend answered with a non-success status.
    Status { status: u16, message: String },
    NotFound(String),
    Decode(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Config(msg) => write!(f, "Backend configuration error: {msg}"),
            BackendError::Network(err) => write!(f, "Backend unreachable: {err}"),
            BackendError::Status { status, message } => {
                write!(f, "Backend returned {status}: {message}")
            }
            BackendError::NotFound(msg) => write!(f, "Not found: {msg}"),
            BackendError::Decode(msg) => write!(f, "Unexpected backend response: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Network(err)
        }
    }
}

#[derive(Clone)]
pub struct Backend {
    client: Client,
    base_url: Url,
    api_key: String,
    service_key: Option<String>,
    bearer: Option<String>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("base_url", &self.base_url.as_str())
            .field("scoped", &self.bearer.is_some())
            .finish()
    }
}

impl Backend {
    /// Build a client. Fails immediately if the URL or key is missing or the
    /// URL is not http(s), so misconfiguration never surfaces mid-request.
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, BackendError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(BackendError::Config("backend URL is not set".to_string()));
        }
        if api_key.trim().is_empty() {
            return Err(BackendError::Config("backend API key is not set".to_string()));
        }

        let base_url = Url::parse(url)
            .map_err(|e| BackendError::Config(format!("invalid backend URL '{url}': {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(BackendError::Config(format!(
                "backend URL must be http or https, got '{}'",
                base_url.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.trim().to_string(),
            service_key: None,
            bearer: None,
        })
    }

    pub fn with_service_role(mut self, key: Option<String>) -> Self {
        self.service_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Copy of this client that authenticates as the given user.
    pub fn scoped(&self, access_token: &str) -> Self {
        Self {
            bearer: Some(access_token.to_string()),
            ..self.clone()
        }
    }

    /// Privileged client using the service-role key, if one is configured.
    /// Server-side only.
    pub fn service(&self) -> Option<Self> {
        let key = self.service_key.clone()?;
        Some(Self {
            bearer: Some(key),
            ..self.clone()
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn endpoint<'a, I>(&self, segments: I) -> Result<Url, BackendError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::Config("backend URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self.bearer.as_deref().unwrap_or(&self.api_key);
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }
}

/// Turn a non-success response into `BackendError::Status`, pulling the
/// message out of whichever field the sub-API uses.
pub(crate) async fn check(resp: Response) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.chars().take(512).collect());

    tracing::debug!("Backend request failed with {status}: {message}");

    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}
