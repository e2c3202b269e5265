use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    Json,
};
use catalog::{artist_detail, normalize, CatalogError, Locale};
use common::{AlbumPage, ArtistList, ArtistSummary, TrackPage};
use tracing::error;

use crate::state::{AppState, JsonResult, LangQuery, SearchQuery};
use crate::utils::json_error;

fn catalog_failure(
    message: &'static str,
    subject: &str,
    err: CatalogError,
) -> (StatusCode, Json<crate::state::ErrorResponse>) {
    error!("{} ({}): {} [{}]", message, subject, err, err.kind());
    json_error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

pub async fn get_artist(
    State(state): State<AppState>,
    AxumPath(artist_id): AxumPath<String>,
    Query(query): Query<LangQuery>,
) -> JsonResult<ArtistSummary> {
    let locale = Locale::from_query(query.lang.as_deref());
    let artist = artist_detail(&state.catalog, &state.enricher, &artist_id, locale)
        .await
        .map_err(|err| {
            catalog_failure(
                "could not fetch the artist from spotify or its description from last.fm",
                &artist_id,
                err,
            )
        })?;
    Ok(Json(artist))
}

pub async fn search_artists(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> JsonResult<ArtistList> {
    let q = query.q.unwrap_or_default();
    let artists = state
        .catalog
        .search_artists(&q)
        .await
        .map_err(|err| catalog_failure("could not search artists", &q, err))?;
    Ok(Json(ArtistList {
        artists: normalize::search_hits(artists),
    }))
}

pub async fn artist_albums(
    State(state): State<AppState>,
    AxumPath(artist_id): AxumPath<String>,
) -> JsonResult<AlbumPage> {
    let page = state
        .catalog
        .albums(&artist_id)
        .await
        .map_err(|err| catalog_failure("could not fetch the artist's albums", &artist_id, err))?;
    Ok(Json(normalize::album_page(page)))
}

pub async fn album_tracks(
    State(state): State<AppState>,
    AxumPath(album_id): AxumPath<String>,
) -> JsonResult<TrackPage> {
    let page = state
        .catalog
        .album_tracks(&album_id)
        .await
        .map_err(|err| catalog_failure("could not fetch the album's tracks", &album_id, err))?;
    Ok(Json(normalize::track_page(page)))
}

pub async fn related_artists(
    State(state): State<AppState>,
    AxumPath(artist_id): AxumPath<String>,
) -> JsonResult<ArtistList> {
    let artists = state
        .catalog
        .related_artists(&artist_id)
        .await
        .map_err(|err| catalog_failure("could not fetch related artists", &artist_id, err))?;
    Ok(Json(ArtistList {
        artists: normalize::search_hits(artists),
    }))
}
