use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::auth::generate_token;
use crate::config::ServerConfig;
use crate::utils::now_secs;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

const STATE_TTL_SECS: u64 = 600;

static AVATAR_SIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"=s\d+-c$").unwrap());

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug)]
pub enum OAuthError {
    Http(String),
    Profile(String),
}

impl std::fmt::Display for OAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OAuthError::Http(err) => write!(f, "google request failed: {}", err),
            OAuthError::Profile(err) => write!(f, "google profile unusable: {}", err),
        }
    }
}

impl std::error::Error for OAuthError {}

#[derive(Clone)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }
}

/// Authorization-code flow against Google. Each `state` handed out by
/// [`GoogleOAuth::authorize_url`] can be redeemed once.
#[derive(Clone)]
pub struct GoogleOAuth {
    http: Client,
    client_id: String,
    client_secret: String,
    callback_url: String,
    endpoints: GoogleEndpoints,
    timeout: Duration,
    pending: Arc<Mutex<HashMap<String, u64>>>,
}

impl GoogleOAuth {
    pub fn new(http: Client, config: &ServerConfig, endpoints: GoogleEndpoints) -> Self {
        Self {
            http,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            callback_url: config.google_callback_url.clone(),
            endpoints,
            timeout: config.upstream_timeout(),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(http: Client, config: &ServerConfig) -> Option<Self> {
        if !config.google_configured() {
            return None;
        }
        Some(Self::new(http, config, GoogleEndpoints::default()))
    }

    pub fn authorize_url(&self) -> Result<String, OAuthError> {
        let state = generate_token();
        let now = now_secs();
        {
            let mut pending = self.pending.lock();
            pending.retain(|_, issued| now.saturating_sub(*issued) < STATE_TTL_SECS);
            pending.insert(state.clone(), now);
        }
        let url = Url::parse_with_params(
            &self.endpoints.auth_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.callback_url.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state.as_str()),
            ],
        )
        .map_err(|err| OAuthError::Http(err.to_string()))?;
        Ok(url.to_string())
    }

    /// Removes `state` from the pending set; false if it was never issued or has expired.
    pub fn take_state(&self, state: &str) -> bool {
        match self.pending.lock().remove(state) {
            Some(issued) => now_secs().saturating_sub(issued) < STATE_TTL_SECS,
            None => false,
        }
    }

    pub async fn exchange(&self, code: &str) -> Result<GoogleProfile, OAuthError> {
        let response = self
            .http
            .post(&self.endpoints.token_url)
            .timeout(self.timeout)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.callback_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|err| OAuthError::Http(err.to_string()))?;
        if !response.status().is_success() {
            return Err(OAuthError::Http(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let token: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|err| OAuthError::Http(err.to_string()))?;
        debug!("google code exchanged");

        let response = self
            .http
            .get(&self.endpoints.userinfo_url)
            .timeout(self.timeout)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|err| OAuthError::Http(err.to_string()))?;
        if !response.status().is_success() {
            return Err(OAuthError::Http(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }
        let profile: GoogleProfile = response
            .json()
            .await
            .map_err(|err| OAuthError::Profile(err.to_string()))?;
        if profile.email.trim().is_empty() {
            return Err(OAuthError::Profile("missing email".to_string()));
        }
        Ok(profile)
    }
}

/// Google serves avatars at a size given by a `=sNN-c` suffix; ask for 200px.
pub fn resize_avatar(url: &str) -> String {
    AVATAR_SIZE.replace(url, "=s200-c").into_owned()
}
