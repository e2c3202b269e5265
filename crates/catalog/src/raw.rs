use common::Image;
use serde::{Deserialize, Deserializer};

#[derive(Clone, Debug, Deserialize)]
pub struct RawPage<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawFollowers {
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawArtist {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub followers: RawFollowers,
    #[serde(default, deserialize_with = "null_as_default")]
    pub popularity: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<Image>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawArtistRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub href: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawAlbum {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_tracks: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub href: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<Image>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub release_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artists: Vec<RawArtistRef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawTrack {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub track_number: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration_ms: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub href: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artists: Vec<RawArtistRef>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RawSearchResponse {
    pub artists: RawPage<RawArtist>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RawRelatedResponse {
    pub artists: Vec<RawArtist>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
