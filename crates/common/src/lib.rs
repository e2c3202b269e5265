use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
    pub href: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedArtist {
    pub name: String,
}

/// Artist detail as served by `GET /artists/:id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
    pub total_followers: u64,
    pub popularity: u32,
    pub image: Option<String>,
    pub genres: Vec<String>,
    pub description: Option<String>,
    #[serde(rename = "relatedArtists")]
    pub related_artists: Vec<RelatedArtist>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub popularity: u32,
    pub genres: Vec<String>,
    pub total_followers: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
    pub total_tracks: u32,
    pub href: String,
    pub images: Vec<Image>,
    pub release_date: String,
    pub artists: Vec<ArtistRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub id: String,
    pub name: String,
    pub track_number: u32,
    pub duration_ms: u64,
    pub href: String,
    pub artists: Vec<ArtistRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumPage {
    pub total_amount: u32,
    pub items: Vec<AlbumSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPage {
    pub total_tracks: u32,
    pub items: Vec<TrackSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistList {
    pub artists: Vec<SearchHit>,
}

/// Expands year-only and year-month release dates to a full `YYYY-MM-DD`.
/// Anything else is returned unchanged.
pub fn normalize_release_date(value: &str) -> String {
    match value.chars().count() {
        4 => format!("{}-01-01", value),
        7 => format!("{}-01", value),
        _ => value.to_string(),
    }
}

pub fn compare_release_dates(a: &str, b: &str) -> Ordering {
    normalize_release_date(a).cmp(&normalize_release_date(b))
}

/// Stable ascending sort; albums with equal normalized dates keep upstream order.
pub fn sort_albums_by_release(albums: &mut [AlbumSummary]) {
    albums.sort_by_cached_key(|album| normalize_release_date(&album.release_date));
}
