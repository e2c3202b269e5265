use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::CatalogError;
use crate::retry::send_with_retry;

pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Subtracted from the advertised lifetime so a token is never sent right
/// at its expiry boundary.
pub const EXPIRY_MARGIN_MS: u64 = 5_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub expires_at_ms: u64,
}

impl CachedToken {
    pub fn is_valid_at(&self, now_ms: u64) -> bool {
        now_ms < self.expires_at_ms
    }
}

#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Client-credentials bearer token for the catalog API, cached in memory.
///
/// The cache is read and replaced under a short lock that is never held
/// across the exchange itself. Callers that miss concurrently may each run an
/// exchange; whichever finishes last is kept. Every token handed out is
/// valid, so the only cost of that overlap is an extra token request.
pub struct TokenCache {
    http: Client,
    token_url: String,
    credentials: Credentials,
    timeout: Duration,
    retries: u32,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(
        http: Client,
        token_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
        retries: u32,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            credentials,
            timeout,
            retries,
            cached: RwLock::new(None),
        }
    }

    pub async fn token(&self) -> Result<String, CatalogError> {
        self.token_at(now_ms()).await
    }

    pub async fn token_at(&self, now_ms: u64) -> Result<String, CatalogError> {
        let cached = self.cached.read().clone();
        if let Some(token) = cached {
            if token.is_valid_at(now_ms) {
                return Ok(token.value);
            }
        }

        let fresh = self.exchange(now_ms).await?;
        let value = fresh.value.clone();
        *self.cached.write() = Some(fresh);
        Ok(value)
    }

    pub fn cached(&self) -> Option<CachedToken> {
        self.cached.read().clone()
    }

    async fn exchange(&self, now_ms: u64) -> Result<CachedToken, CatalogError> {
        if !self.credentials.is_configured() {
            return Err(CatalogError::UpstreamAuth(
                "catalog client credentials are not configured".to_string(),
            ));
        }
        debug!("requesting catalog access token");
        let response = send_with_retry(self.retries, || {
            self.http
                .post(&self.token_url)
                .basic_auth(
                    &self.credentials.client_id,
                    Some(&self.credentials.client_secret),
                )
                .form(&[("grant_type", "client_credentials")])
                .timeout(self.timeout)
        })
        .await
        .map_err(|err| CatalogError::Unavailable(format!("token request failed: {}", err)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::UpstreamAuth(format!(
                "token endpoint returned http {}",
                status
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|err| CatalogError::Unavailable(format!("token read failed: {}", err)))?;
        let payload: TokenResponse = serde_json::from_str(&body).map_err(|err| {
            CatalogError::UpstreamAuth(format!("malformed token response: {}", err))
        })?;

        let lifetime_ms = payload.expires_in.saturating_mul(1000);
        Ok(CachedToken {
            value: payload.access_token,
            expires_at_ms: now_ms
                .saturating_add(lifetime_ms)
                .saturating_sub(EXPIRY_MARGIN_MS),
        })
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_millis() as u64)
        .unwrap_or(0)
}
