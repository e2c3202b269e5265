use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use tracing::error;

use crate::state::{
    AddHistoryRequest, AppState, AuthContext, BookmarkRequest, CheckCompletedRequest, JsonResult,
    RemoveBookmarkRequest,
};
use crate::user_data::{BookmarkInsert, BookmarkKind, NewBookmark, UserDataError, LIST_LIMIT};
use crate::utils::{album_track_count, json_error, json_error_response};

/// Response keys and messages for one bookmark list.
struct Labels {
    item: &'static str,
    list: &'static str,
    added: &'static str,
    duplicate: &'static str,
    removed: &'static str,
    missing: &'static str,
}

fn labels(kind: BookmarkKind) -> Labels {
    match kind {
        BookmarkKind::Favorite => Labels {
            item: "favorite",
            list: "favorites",
            added: "album added to favorites",
            duplicate: "album is already a favorite",
            removed: "favorite removed",
            missing: "favorite not found",
        },
        BookmarkKind::Completed => Labels {
            item: "completedAlbum",
            list: "completedAlbums",
            added: "album marked as completed",
            duplicate: "album is already completed",
            removed: "album unmarked as completed",
            missing: "album not found",
        },
    }
}

fn store_error(err: UserDataError) -> (StatusCode, Json<crate::state::ErrorResponse>) {
    error!("user data store failed: {}", err);
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}

fn keyed(entries: Vec<(&str, Value)>) -> Json<Value> {
    let mut map = Map::new();
    for (key, value) in entries {
        map.insert(key.to_string(), value);
    }
    Json(Value::Object(map))
}

pub async fn add_history(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<AddHistoryRequest>,
) -> JsonResult<Value> {
    if payload.artist_id.trim().is_empty() || payload.artist_name.trim().is_empty() {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "artistId and artistName are required",
        ));
    }
    let history = state
        .user_data
        .add_history(&ctx.user.id, &payload.artist_id, &payload.artist_name)
        .map_err(store_error)?;
    Ok(Json(json!({ "history": history })))
}

pub async fn list_history(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> JsonResult<Value> {
    let histories = state
        .user_data
        .list_history(&ctx.user.id, LIST_LIMIT)
        .map_err(store_error)?;
    Ok(Json(json!({ "histories": histories })))
}

fn add_bookmark(
    state: &AppState,
    ctx: &AuthContext,
    kind: BookmarkKind,
    payload: BookmarkRequest,
) -> Response {
    let labels = labels(kind);
    if payload.album_id.trim().is_empty() || payload.album_name.trim().is_empty() {
        return json_error_response(StatusCode::BAD_REQUEST, "albumId and albumName are required");
    }
    let album = NewBookmark {
        album_tracks: album_track_count(payload.album_tracks.as_ref()),
        album_id: payload.album_id,
        album_name: payload.album_name,
        album_image: payload.album_image.filter(|image| !image.is_empty()),
    };
    match state.user_data.add_bookmark(kind, &ctx.user.id, album) {
        Ok(BookmarkInsert::Created(bookmark)) => keyed(vec![
            (labels.item, json!(bookmark)),
            ("message", json!(labels.added)),
        ])
        .into_response(),
        Ok(BookmarkInsert::Exists(bookmark)) => (
            StatusCode::CONFLICT,
            keyed(vec![
                ("error", json!(labels.duplicate)),
                (labels.item, json!(bookmark)),
            ]),
        )
            .into_response(),
        Err(err) => store_error(err).into_response(),
    }
}

fn remove_bookmark(
    state: &AppState,
    ctx: &AuthContext,
    kind: BookmarkKind,
    payload: RemoveBookmarkRequest,
) -> Response {
    let labels = labels(kind);
    if payload.album_id.trim().is_empty() {
        return json_error_response(StatusCode::BAD_REQUEST, "albumId is required");
    }
    match state.user_data.remove_bookmark(kind, &ctx.user.id, &payload.album_id) {
        Ok(true) => Json(json!({ "message": labels.removed, "deleted": 1 })).into_response(),
        Ok(false) => json_error_response(StatusCode::NOT_FOUND, labels.missing),
        Err(err) => store_error(err).into_response(),
    }
}

fn list_bookmarks(state: &AppState, ctx: &AuthContext, kind: BookmarkKind) -> JsonResult<Value> {
    let items = state
        .user_data
        .list_bookmarks(kind, &ctx.user.id, Some(LIST_LIMIT))
        .map_err(store_error)?;
    Ok(keyed(vec![(labels(kind).list, json!(items))]))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<BookmarkRequest>,
) -> Response {
    add_bookmark(&state, &ctx, BookmarkKind::Favorite, payload)
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<RemoveBookmarkRequest>,
) -> Response {
    remove_bookmark(&state, &ctx, BookmarkKind::Favorite, payload)
}

pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> JsonResult<Value> {
    list_bookmarks(&state, &ctx, BookmarkKind::Favorite)
}

pub async fn add_completed(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<BookmarkRequest>,
) -> Response {
    add_bookmark(&state, &ctx, BookmarkKind::Completed, payload)
}

pub async fn remove_completed(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<RemoveBookmarkRequest>,
) -> Response {
    remove_bookmark(&state, &ctx, BookmarkKind::Completed, payload)
}

pub async fn list_completed(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> JsonResult<Value> {
    list_bookmarks(&state, &ctx, BookmarkKind::Completed)
}

pub async fn check_completed(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<CheckCompletedRequest>,
) -> JsonResult<Value> {
    let ids = state
        .user_data
        .completed_ids(&ctx.user.id, &payload.album_ids)
        .map_err(store_error)?;
    Ok(Json(json!({ "completedIds": ids })))
}

#[cfg(test)]
mod tests {
    use reqwest::Client;
    use serde_json::{json, Value};

    use crate::api::test_support::{login, spawn_app, upstream_stub};

    #[tokio::test]
    async fn history_round_trip_newest_first() {
        let upstream = upstream_stub().await;
        let app = spawn_app(&upstream).await;
        let token = login(&app, "hana").await;
        let http = Client::new();

        for id in ["a1", "a2"] {
            let response = http
                .post(format!("{}/history", app.base))
                .bearer_auth(&token)
                .json(&json!({"artistId": id, "artistName": "Band"}))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 200);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        let missing = http
            .post(format!("{}/history", app.base))
            .bearer_auth(&token)
            .json(&json!({"artistId": "a3"}))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 400);

        let body: Value = http
            .get(format!("{}/history", app.base))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let histories = body["histories"].as_array().unwrap();
        assert_eq!(histories.len(), 2);
        assert_eq!(histories[0]["artistId"], "a2");
    }

    #[tokio::test]
    async fn favorites_conflict_and_delete() {
        let upstream = upstream_stub().await;
        let app = spawn_app(&upstream).await;
        let token = login(&app, "ivo").await;
        let http = Client::new();
        let album = json!({"albumId": "AL", "albumName": "Album", "albumTracks": [1, 2, 3]});

        let first = http
            .post(format!("{}/favorites", app.base))
            .bearer_auth(&token)
            .json(&album)
            .send()
            .await
            .unwrap();
        assert_eq!(first.status(), 200);
        let body: Value = first.json().await.unwrap();
        assert_eq!(body["favorite"]["albumTracks"], "3");

        let again = http
            .post(format!("{}/favorites", app.base))
            .bearer_auth(&token)
            .json(&album)
            .send()
            .await
            .unwrap();
        assert_eq!(again.status(), 409);
        let body: Value = again.json().await.unwrap();
        assert_eq!(body["favorite"]["albumId"], "AL");

        let removed = http
            .delete(format!("{}/favorites", app.base))
            .bearer_auth(&token)
            .json(&json!({"albumId": "AL"}))
            .send()
            .await
            .unwrap();
        assert_eq!(removed.status(), 200);
        let gone = http
            .delete(format!("{}/favorites", app.base))
            .bearer_auth(&token)
            .json(&json!({"albumId": "AL"}))
            .send()
            .await
            .unwrap();
        assert_eq!(gone.status(), 404);
    }

    #[tokio::test]
    async fn completed_albums_check_is_per_user() {
        let upstream = upstream_stub().await;
        let app = spawn_app(&upstream).await;
        let owner = login(&app, "jo").await;
        let other = login(&app, "kai").await;
        let http = Client::new();

        let response = http
            .post(format!("{}/completedAlbums", app.base))
            .bearer_auth(&owner)
            .json(&json!({"albumId": "B", "albumName": "Album B", "albumTracks": 11}))
            .send()
            .await
            .unwrap();
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["completedAlbum"]["albumTracks"], "11");

        let check = |token: String| {
            let http = http.clone();
            let url = format!("{}/completedAlbums/check", app.base);
            async move {
                let body: Value = http
                    .post(url)
                    .bearer_auth(token)
                    .json(&json!({"albumIds": ["A", "B"]}))
                    .send()
                    .await
                    .unwrap()
                    .json()
                    .await
                    .unwrap();
                body["completedIds"].clone()
            }
        };
        assert_eq!(check(owner.clone()).await, json!(["B"]));
        assert_eq!(check(other).await, json!([]));

        let body: Value = http
            .get(format!("{}/completedAlbums", app.base))
            .bearer_auth(&owner)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["completedAlbums"].as_array().unwrap().len(), 1);
    }
}
