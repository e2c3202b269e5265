use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::CatalogError;
use crate::raw::{RawAlbum, RawArtist, RawPage, RawRelatedResponse, RawSearchResponse, RawTrack};
use crate::retry::send_with_retry;
use crate::token::{Credentials, TokenCache, DEFAULT_TOKEN_URL};

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
pub const SEARCH_LIMIT: u32 = 10;
pub const PAGE_LIMIT: u32 = 50;
pub const MIN_QUERY_CHARS: usize = 2;

#[derive(Clone, Debug)]
pub struct CatalogSettings {
    pub api_base: String,
    pub token_url: String,
    pub credentials: Credentials,
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            credentials: Credentials::default(),
            timeout: Duration::from_secs(10),
            retries: 2,
        }
    }
}

/// Authenticated access to the catalog REST API.
///
/// Every request carries the bearer token from the shared [`TokenCache`].
/// A 401 surfaces as [`CatalogError::UpstreamAuth`]; the request is not
/// replayed with a forced refresh. Album and track listings only read the
/// first page of `PAGE_LIMIT` entries.
#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    api_base: String,
    timeout: Duration,
    retries: u32,
    tokens: Arc<TokenCache>,
}

impl CatalogClient {
    pub fn new(
        http: Client,
        api_base: impl Into<String>,
        tokens: Arc<TokenCache>,
        timeout: Duration,
        retries: u32,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            timeout,
            retries,
            tokens,
        }
    }

    pub fn from_settings(http: Client, settings: &CatalogSettings) -> Self {
        let tokens = Arc::new(TokenCache::new(
            http.clone(),
            settings.token_url.clone(),
            settings.credentials.clone(),
            settings.timeout,
            settings.retries,
        ));
        Self::new(
            http,
            settings.api_base.clone(),
            tokens,
            settings.timeout,
            settings.retries,
        )
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    pub async fn artist(&self, artist_id: &str) -> Result<RawArtist, CatalogError> {
        self.get_json(&format!("/artists/{}", path_segment(artist_id)), &[])
            .await
    }

    /// Queries shorter than `MIN_QUERY_CHARS` return nothing without a request.
    pub async fn search_artists(&self, query: &str) -> Result<Vec<RawArtist>, CatalogError> {
        if query.chars().count() < MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }
        let response: RawSearchResponse = self
            .get_json(
                "/search",
                &[
                    ("q", query.to_string()),
                    ("type", "artist".to_string()),
                    ("limit", SEARCH_LIMIT.to_string()),
                ],
            )
            .await?;
        Ok(response.artists.items)
    }

    pub async fn albums(&self, artist_id: &str) -> Result<RawPage<RawAlbum>, CatalogError> {
        self.get_json(
            &format!("/artists/{}/albums", path_segment(artist_id)),
            &[("limit", PAGE_LIMIT.to_string())],
        )
        .await
    }

    pub async fn album_tracks(&self, album_id: &str) -> Result<RawPage<RawTrack>, CatalogError> {
        self.get_json(
            &format!("/albums/{}/tracks", path_segment(album_id)),
            &[("limit", PAGE_LIMIT.to_string())],
        )
        .await
    }

    pub async fn related_artists(&self, artist_id: &str) -> Result<Vec<RawArtist>, CatalogError> {
        let response: RawRelatedResponse = self
            .get_json(
                &format!("/artists/{}/related-artists", path_segment(artist_id)),
                &[],
            )
            .await?;
        Ok(response.artists)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let token = self.tokens.token().await?;
        let url = format!("{}{}", self.api_base.trim_end_matches('/'), path);
        debug!("catalog GET {}", path);
        let response = send_with_retry(self.retries, || {
            self.http
                .get(&url)
                .query(query)
                .bearer_auth(&token)
                .timeout(self.timeout)
        })
        .await
        .map_err(|err| CatalogError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(CatalogError::UpstreamAuth(format!(
                "catalog rejected bearer token for {}",
                path
            )));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(path.to_string()));
        }
        let body = response
            .text()
            .await
            .map_err(|err| CatalogError::Unavailable(err.to_string()))?;
        if !status.is_success() {
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&body),
            });
        }
        serde_json::from_str(&body)
            .map_err(|err| CatalogError::MalformedPayload(format!("{}: {}", path, err)))
    }
}

/// Pulls `error.message` out of a catalog error body, falling back to the raw text.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(|message| message.as_str())
                .map(|message| message.to_string())
        })
        .unwrap_or_else(|| body.trim().to_string())
}

pub(crate) fn path_segment(input: &str) -> String {
    let mut out = String::new();
    for byte in input.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(*byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
