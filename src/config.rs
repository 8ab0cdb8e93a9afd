use std::net::IpAddr;
use std::time::Duration;

use crate::backend::identity::OAuthProvider;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub backend_anon_key: String,
    /// Privileged key. Server-side only, never sent to clients.
    pub backend_service_role_key: Option<String>,
    pub backend_timeout: Duration,
    pub session_secret: String,
    pub github: Option<OAuthCredentials>,
    pub google: Option<OAuthCredentials>,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub max_body_size: usize,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse configuration from any key lookup. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| format!("Missing required environment variable: {key}"))
        };
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let backend_url = required("BACKEND_URL")?;
        let backend_anon_key = required("BACKEND_ANON_KEY")?;
        let session_secret = required("SESSION_SECRET")?;
        let backend_service_role_key = get("BACKEND_SERVICE_ROLE_KEY");

        let timeout_secs: u64 = or("CODECRAFT_BACKEND_TIMEOUT_SECS", "30")
            .parse()
            .map_err(|e| format!("Invalid CODECRAFT_BACKEND_TIMEOUT_SECS: {e}"))?;

        let host: IpAddr = or("CODECRAFT_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid CODECRAFT_HOST: {e}"))?;

        let port: u16 = or("CODECRAFT_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid CODECRAFT_PORT: {e}"))?;

        let base_url = or("CODECRAFT_BASE_URL", &format!("http://{host}:{port}"));

        let max_body_size: usize = or("CODECRAFT_MAX_BODY_SIZE", "10485760")
            .parse()
            .map_err(|e| format!("Invalid CODECRAFT_MAX_BODY_SIZE: {e}"))?;

        let log_level = or("CODECRAFT_LOG_LEVEL", "info");

        let credentials = |id: &str, secret: &str| match (get(id), get(secret)) {
            (Some(client_id), Some(client_secret)) => Some(OAuthCredentials {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        Ok(Config {
            backend_url,
            backend_anon_key,
            backend_service_role_key,
            backend_timeout: Duration::from_secs(timeout_secs),
            session_secret,
            github: credentials("GITHUB_ID", "GITHUB_SECRET"),
            google: credentials("GOOGLE_ID", "GOOGLE_SECRET"),
            host,
            port,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_body_size,
            log_level,
        })
    }

    /// A provider is offered only when both halves of its credentials are set.
    pub fn oauth_enabled(&self, provider: OAuthProvider) -> bool {
        match provider {
            OAuthProvider::Github => self.github.is_some(),
            OAuthProvider::Google => self.google.is_some(),
        }
    }
}
