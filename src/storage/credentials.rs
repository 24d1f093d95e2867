//! OAuth credentials for the photo store.
//!
//! `TokenFileCredentials` reads an authorized-user `token.json` (the file
//! written by Google's installed-app flow), refreshes the access token with
//! the stored refresh token once it is close to expiry, and writes the
//! refreshed token back so the next start does not refresh again.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::types::{Credential, CredentialProvider};
use super::StoreError;
use crate::models::inventory::{format_timestamp, parse_timestamp};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens expiring within this window are refreshed ahead of use.
const EXPIRY_SKEW_SECS: i64 = 60;

// ═══════════════════════════════════════════════════════════
// Token file
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuthorizedUser {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
    client_id: String,
    client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<String>,
    /// Fields we do not interpret (scopes, account, ...) survive a rewrite.
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl AuthorizedUser {
    fn usable_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.token.as_deref().filter(|t| !t.is_empty())?;
        let expiry = self.expiry.as_deref().and_then(|e| parse_timestamp(e).ok())?;
        (expiry - chrono::Duration::seconds(EXPIRY_SKEW_SECS) > now).then_some(token)
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

pub struct TokenFileCredentials {
    path: PathBuf,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    state: Mutex<Option<AuthorizedUser>>,
}

impl TokenFileCredentials {
    pub fn new(path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            client,
            timeout_secs: timeout.as_secs(),
            state: Mutex::new(None),
        })
    }

    fn read_token_file(&self) -> Result<AuthorizedUser, StoreError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            StoreError::Credential(format!(
                "cannot read {}: {e} (authorize the application first)",
                self.path.display()
            ))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| StoreError::Credential(format!("malformed {}: {e}", self.path.display())))
    }

    fn refresh(&self, user: &mut AuthorizedUser) -> Result<(), StoreError> {
        let refresh_token = user
            .refresh_token
            .clone()
            .ok_or_else(|| StoreError::Credential("token expired and no refresh token stored".into()))?;

        debug!(token_uri = %user.token_uri, "Refreshing access token");
        let response = self
            .client
            .post(&user.token_uri)
            .form(&[
                ("client_id", user.client_id.as_str()),
                ("client_secret", user.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .map_err(|e| StoreError::from_reqwest(e, &user.token_uri, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RefreshResponse = response
            .json()
            .map_err(|e| StoreError::ResponseParsing(e.to_string()))?;

        let expires_in = parsed.expires_in.unwrap_or(3600);
        user.token = Some(parsed.access_token);
        user.expiry = Some(format_timestamp(&(Utc::now() + chrono::Duration::seconds(expires_in))));

        let json = serde_json::to_string_pretty(user)
            .map_err(|e| StoreError::Credential(e.to_string()))?;
        std::fs::write(&self.path, json)?;
        info!(path = %self.path.display(), "Access token refreshed");
        Ok(())
    }
}

impl CredentialProvider for TokenFileCredentials {
    fn valid_credential(&self) -> Result<Credential, StoreError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Credential("credential cache poisoned".into()))?;

        if guard.is_none() {
            *guard = Some(self.read_token_file()?);
        }
        let Some(user) = guard.as_mut() else {
            return Err(StoreError::Credential("token file not loaded".into()));
        };

        if let Some(token) = user.usable_token(Utc::now()) {
            return Ok(Credential::new(token));
        }

        self.refresh(user)?;
        user.token
            .as_deref()
            .map(Credential::new)
            .ok_or_else(|| StoreError::Credential("refresh returned no token".into()))
    }
}

// ═══════════════════════════════════════════════════════════
// Static credentials
// ═══════════════════════════════════════════════════════════

/// Fixed token, never refreshed.
pub struct StaticCredentials {
    token: String,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl CredentialProvider for StaticCredentials {
    fn valid_credential(&self) -> Result<Credential, StoreError> {
        Ok(Credential::new(self.token.clone()))
    }
}
