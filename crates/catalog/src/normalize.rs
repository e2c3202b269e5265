//! Pure reshaping of catalog payloads into the served schema.

use common::{
    sort_albums_by_release, AlbumPage, AlbumSummary, ArtistRef, ArtistSummary, RelatedArtist,
    SearchHit, TrackPage, TrackSummary,
};

use crate::raw::{RawAlbum, RawArtist, RawArtistRef, RawPage, RawTrack};

/// Search results only carry the leading genres.
pub const SEARCH_GENRE_LIMIT: usize = 3;

pub fn artist_summary(
    raw: RawArtist,
    description: Option<String>,
    related_artists: Vec<RelatedArtist>,
) -> ArtistSummary {
    ArtistSummary {
        image: first_image(&raw),
        total_followers: raw.followers.total.unwrap_or(0),
        id: raw.id,
        name: raw.name,
        popularity: raw.popularity,
        genres: raw.genres,
        description,
        related_artists,
    }
}

pub fn search_hit(raw: RawArtist) -> SearchHit {
    SearchHit {
        image: first_image(&raw),
        total_followers: raw.followers.total.unwrap_or(0),
        id: raw.id,
        name: raw.name,
        popularity: raw.popularity,
        genres: raw.genres.into_iter().take(SEARCH_GENRE_LIMIT).collect(),
    }
}

pub fn search_hits(raw: Vec<RawArtist>) -> Vec<SearchHit> {
    raw.into_iter().map(search_hit).collect()
}

pub fn album_summary(raw: RawAlbum) -> AlbumSummary {
    AlbumSummary {
        id: raw.id,
        name: raw.name,
        total_tracks: raw.total_tracks,
        href: raw.href,
        images: raw.images,
        release_date: raw.release_date,
        artists: artist_refs(raw.artists),
    }
}

/// Albums come back oldest first; see [`common::normalize_release_date`].
pub fn album_page(raw: RawPage<RawAlbum>) -> AlbumPage {
    let total_amount = raw.total.unwrap_or(raw.items.len() as u32);
    let mut items: Vec<AlbumSummary> = raw.items.into_iter().map(album_summary).collect();
    sort_albums_by_release(&mut items);
    AlbumPage {
        total_amount,
        items,
    }
}

pub fn track_summary(raw: RawTrack) -> TrackSummary {
    TrackSummary {
        id: raw.id,
        name: raw.name,
        track_number: raw.track_number,
        duration_ms: raw.duration_ms,
        href: raw.href,
        artists: artist_refs(raw.artists),
    }
}

pub fn track_page(raw: RawPage<RawTrack>) -> TrackPage {
    let total_tracks = raw.total.unwrap_or(raw.items.len() as u32);
    TrackPage {
        total_tracks,
        items: raw.items.into_iter().map(track_summary).collect(),
    }
}

fn first_image(raw: &RawArtist) -> Option<String> {
    raw.images.first().map(|image| image.url.clone())
}

fn artist_refs(raw: Vec<RawArtistRef>) -> Vec<ArtistRef> {
    raw.into_iter()
        .map(|artist| ArtistRef {
            id: artist.id,
            name: artist.name,
            href: artist.href,
        })
        .collect()
}
