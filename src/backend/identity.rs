//! GoTrue-style identity API: email/password, OAuth redirects, sessions.

use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{Backend, BackendError, check};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl IdentityUser {
    /// Display name from sign-up metadata or the OAuth profile.
    pub fn display_name(&self) -> Option<String> {
        ["name", "full_name"]
            .iter()
            .find_map(|k| self.user_metadata.get(*k).and_then(|v| v.as_str()))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn avatar_url(&self) -> Option<String> {
        self.user_metadata
            .get("avatar_url")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
    pub user: IdentityUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Sign-up answers with a session when the backend auto-confirms, and with
/// the bare user when email confirmation is pending.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    Session(Session),
    PendingConfirmation(IdentityUser),
}

impl SignUpOutcome {
    pub fn user(&self) -> &IdentityUser {
        match self {
            SignUpOutcome::Session(session) => &session.user,
            SignUpOutcome::PendingConfirmation(user) => user,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SignUpOutcome::Session(session) => Some(session),
            SignUpOutcome::PendingConfirmation(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Github,
    Google,
}

impl OAuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            OAuthProvider::Github => "github",
            OAuthProvider::Google => "google",
        }
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(OAuthProvider::Github),
            "google" => Ok(OAuthProvider::Google),
            other => Err(format!("Unknown OAuth provider: {other}")),
        }
    }
}

impl Backend {
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<SignUpOutcome, BackendError> {
        let url = self.endpoint(["auth", "v1", "signup"])?;
        let resp = self
            .request(Method::POST, url)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "name": name.unwrap_or_default() },
            }))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        self.token_grant("password", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        self.token_grant("refresh_token", &json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn token_grant(&self, grant_type: &str, body: &Value) -> Result<Session, BackendError> {
        let mut url = self.endpoint(["auth", "v1", "token"])?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let resp = self.request(Method::POST, url).json(body).send().await?;
        Ok(check(resp).await?.json().await?)
    }

    /// Revoke the session this client is scoped to.
    pub async fn sign_out(&self) -> Result<(), BackendError> {
        let url = self.endpoint(["auth", "v1", "logout"])?;
        let resp = self.request(Method::POST, url).send().await?;
        check(resp).await?;
        Ok(())
    }

    /// The user behind this client's access token.
    pub async fn get_user(&self) -> Result<IdentityUser, BackendError> {
        let url = self.endpoint(["auth", "v1", "user"])?;
        let resp = self.request(Method::GET, url).send().await?;
        Ok(check(resp).await?.json().await?)
    }

    /// Where to send the browser to start an OAuth sign-in.
    pub fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<Url, BackendError> {
        let mut url = self.endpoint(["auth", "v1", "authorize"])?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to);
        Ok(url)
    }
}
