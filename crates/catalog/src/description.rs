use std::time::Duration;

use common::RelatedArtist;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use crate::enrichment::Enrichment;
use crate::error::CatalogError;
use crate::locale::Locale;
use crate::retry::send_with_retry;

pub const DEFAULT_LASTFM_BASE: &str = "https://ws.audioscrobbler.com/2.0/";

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("markup pattern"));
static MEMBERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bMembers\b").expect("members pattern"));
static FORMATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bFormation\b").expect("formation pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

const READ_MORE: &str = "Read more";
const DRUMS: &str = "(drums)";

/// Artist biographies and similar artists from the biography provider.
///
/// Nothing here fails the caller: provider errors come back as
/// [`Enrichment::Degraded`] and empty answers as [`Enrichment::Absent`].
#[derive(Clone)]
pub struct DescriptionEnricher {
    http: Client,
    api_base: String,
    api_key: String,
    timeout: Duration,
    retries: u32,
}

impl DescriptionEnricher {
    pub fn new(
        http: Client,
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        retries: u32,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            api_key: api_key.into(),
            timeout,
            retries,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Walks `preferred.fallback_chain()` until a locale yields a non-empty
    /// summary. A provider error stops the walk.
    pub async fn description(&self, artist_name: &str, preferred: Locale) -> Enrichment<String> {
        if !self.is_configured() {
            return Enrichment::Absent;
        }
        for locale in preferred.fallback_chain() {
            let payload = match self.call("artist.getInfo", artist_name, Some(locale)).await {
                Ok(payload) => payload,
                Err(err) => {
                    warn!("biography lookup for {:?} failed: {}", artist_name, err);
                    return Enrichment::Degraded(err.to_string());
                }
            };
            if let Some(summary) = extract_summary(&payload) {
                let cleaned = clean_description(summary);
                if !cleaned.is_empty() {
                    return Enrichment::Ready(cleaned);
                }
            }
        }
        Enrichment::Absent
    }

    pub async fn similar_artists(&self, artist_name: &str) -> Enrichment<Vec<RelatedArtist>> {
        if !self.is_configured() {
            return Enrichment::Absent;
        }
        match self.call("artist.getSimilar", artist_name, None).await {
            Ok(payload) => match extract_similar(&payload) {
                Some(artists) => Enrichment::Ready(artists),
                None => Enrichment::Absent,
            },
            Err(err) => {
                warn!("similar artists lookup for {:?} failed: {}", artist_name, err);
                Enrichment::Degraded(err.to_string())
            }
        }
    }

    async fn call(
        &self,
        method: &str,
        artist_name: &str,
        locale: Option<Locale>,
    ) -> Result<Value, CatalogError> {
        let mut query = vec![
            ("method", method),
            ("artist", artist_name),
            ("api_key", self.api_key.as_str()),
            ("format", "json"),
        ];
        if let Some(locale) = locale {
            query.push(("lang", locale.code()));
        }
        let response = send_with_retry(self.retries, || {
            self.http
                .get(&self.api_base)
                .query(&query)
                .timeout(self.timeout)
        })
        .await
        .map_err(|err| CatalogError::Unavailable(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
                message: format!("{} failed", method),
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|err| CatalogError::MalformedPayload(err.to_string()))
    }
}

pub fn extract_summary(payload: &Value) -> Option<&str> {
    payload.pointer("/artist/bio/summary")?.as_str()
}

/// `None` unless `similarartists.artist` is an array.
pub fn extract_similar(payload: &Value) -> Option<Vec<RelatedArtist>> {
    let items = payload.pointer("/similarartists/artist")?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.get("name")?.as_str())
            .map(|name| RelatedArtist {
                name: name.to_string(),
            })
            .collect(),
    )
}

/// Turns a provider summary into plain text: markup is dropped, the
/// "Read more" footer and everything after it is cut, the generated
/// `Members`/`Formation` headings are removed (a trailing `(drums)` gets its
/// period back when the latter is present) and whitespace is collapsed.
pub fn clean_description(raw: &str) -> String {
    let mut text = MARKUP.replace_all(raw, "").into_owned();

    if let Some(pos) = text.find(READ_MORE) {
        text.truncate(pos);
    }

    if text.contains("Members") {
        text = MEMBERS.replace_all(&text, "").into_owned();
    }

    if text.contains("Formation") {
        text = FORMATION.replace_all(&text, "").into_owned();
        text = terminate_drums(&text);
    }

    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn terminate_drums(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut rest = text;
    while let Some(pos) = rest.find(DRUMS) {
        let end = pos + DRUMS.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];
        if !rest.starts_with('.') {
            out.push('.');
        }
    }
    out.push_str(rest);
    out
}
