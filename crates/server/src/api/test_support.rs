use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use catalog::{CatalogClient, DescriptionEnricher};
use reqwest::Client;
use serde_json::{json, Value};

use crate::api::app_router;
use crate::auth::AuthStore;
use crate::config::ServerConfig;
use crate::oauth::{GoogleEndpoints, GoogleOAuth};
use crate::state::AppState;
use crate::user_data::{open_or_create_db, UserDataStore};

#[derive(Clone, Default)]
pub(crate) struct HitCounter(Arc<AtomicUsize>);

impl HitCounter {
    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn load(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// One local server standing in for Spotify, Last.fm and Google.
pub(crate) struct Upstream {
    pub base: String,
    pub search_hits: HitCounter,
}

fn artist(id: &str, name: &str, genres: &[&str]) -> Value {
    json!({
        "id": id,
        "name": name,
        "followers": {"href": null, "total": 100},
        "popularity": 50,
        "images": [{"url": "u"}],
        "genres": genres,
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == "Bearer tok")
}

pub(crate) async fn upstream_stub() -> Upstream {
    let search_hits = HitCounter::default();
    let search_counter = search_hits.clone();

    let router = Router::new()
        .route(
            "/api/token",
            post(|| async {
                Json(json!({"access_token": "tok", "token_type": "Bearer", "expires_in": 3600}))
            }),
        )
        .route(
            "/v1/artists/:id",
            get(|Path(id): Path<String>, headers: HeaderMap| async move {
                if !authorized(&headers) {
                    return (StatusCode::UNAUTHORIZED, Json(json!({})));
                }
                if id == "X" {
                    (
                        StatusCode::OK,
                        Json(artist("X", "Band", &["rock", "pop", "jazz", "blues"])),
                    )
                } else {
                    (
                        StatusCode::NOT_FOUND,
                        Json(json!({"error": {"status": 404, "message": "non existing id"}})),
                    )
                }
            }),
        )
        .route(
            "/v1/search",
            get(move || {
                let hits = search_counter.clone();
                async move {
                    hits.hit();
                    Json(json!({"artists": {"items": [artist("X", "Band", &["rock", "pop", "jazz", "blues"])], "total": 1}}))
                }
            }),
        )
        .route(
            "/v1/artists/:id/albums",
            get(|| async {
                Json(json!({
                    "total": 3,
                    "items": [
                        {"id": "c", "name": "C", "total_tracks": 9, "release_date": "2000", "images": [], "artists": []},
                        {"id": "a", "name": "A", "total_tracks": 9, "release_date": "1997-05-21", "images": [], "artists": []},
                        {"id": "b", "name": "B", "total_tracks": 9, "release_date": "1998-03", "images": [], "artists": []},
                    ]
                }))
            }),
        )
        .route(
            "/v1/albums/:id/tracks",
            get(|| async {
                Json(json!({
                    "total": 2,
                    "items": [
                        {"id": "t1", "name": "One", "track_number": 1, "duration_ms": 1000, "artists": []},
                        {"id": "t2", "name": "Two", "track_number": 2, "duration_ms": 2000, "artists": []},
                    ]
                }))
            }),
        )
        .route(
            "/v1/artists/:id/related-artists",
            get(|| async { Json(json!({"artists": [artist("R", "Related", &[])]})) }),
        )
        .route(
            "/2.0/",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                match params.get("method").map(String::as_str) {
                    Some("artist.getSimilar") => {
                        Json(json!({"similarartists": {"artist": [{"name": "Other Band"}]}}))
                    }
                    _ if params.get("lang").map(String::as_str) == Some("en") => Json(json!({
                        "artist": {"bio": {"summary": "English bio <a href=\"https://last.fm\">Read more on Last.fm</a>"}}
                    })),
                    _ => Json(json!({"artist": {"bio": {"summary": ""}}})),
                }
            }),
        )
        .route(
            "/google/token",
            post(|body: String| async move {
                if body.contains("code=good") {
                    (StatusCode::OK, Json(json!({"access_token": "gtok"})))
                } else {
                    (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"})))
                }
            }),
        )
        .route(
            "/google/userinfo",
            get(|| async {
                Json(json!({
                    "email": "g@example.com",
                    "name": "Gina",
                    "picture": "https://lh3.googleusercontent.com/a/pic=s96-c",
                }))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Upstream {
        base: format!("http://{}", addr),
        search_hits,
    }
}

pub(crate) struct TestApp {
    pub base: String,
    pub state: AppState,
    _dir: tempfile::TempDir,
}

pub(crate) fn test_state(upstream: &Upstream) -> (tempfile::TempDir, AppState) {
    let config = ServerConfig {
        spotify_client_id: "id".to_string(),
        spotify_client_secret: "secret".to_string(),
        spotify_api_base: format!("{}/v1", upstream.base),
        spotify_token_url: format!("{}/api/token", upstream.base),
        lastfm_api_key: "lastfm-key".to_string(),
        lastfm_api_base: format!("{}/2.0/", upstream.base),
        upstream_retries: 0,
        google_client_id: "cid".to_string(),
        google_client_secret: "csecret".to_string(),
        ..ServerConfig::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(open_or_create_db(&dir.path().join("test.redb")).unwrap());
    let auth = AuthStore::new(Arc::clone(&db), config.session_ttl());
    auth.init_tables().unwrap();
    let user_data = UserDataStore::new(db);
    user_data.init_tables().unwrap();

    let http = Client::new();
    let endpoints = GoogleEndpoints {
        auth_url: format!("{}/google/auth", upstream.base),
        token_url: format!("{}/google/token", upstream.base),
        userinfo_url: format!("{}/google/userinfo", upstream.base),
    };
    let state = AppState {
        catalog: CatalogClient::from_settings(http.clone(), &config.catalog_settings()),
        enricher: DescriptionEnricher::new(
            http.clone(),
            config.lastfm_api_base.clone(),
            config.lastfm_api_key.clone(),
            config.upstream_timeout(),
            config.upstream_retries,
        ),
        oauth: Some(GoogleOAuth::new(http, &config, endpoints)),
        config: Arc::new(config),
        auth,
        user_data,
    };
    (dir, state)
}

pub(crate) async fn spawn_app(upstream: &Upstream) -> TestApp {
    let (dir, state) = test_state(upstream);
    let app = app_router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    TestApp {
        base: format!("http://{}", addr),
        state,
        _dir: dir,
    }
}

/// Registers `username` and returns a bearer token for it.
pub(crate) async fn login(app: &TestApp, username: &str) -> String {
    let http = Client::new();
    let response = http
        .post(format!("{}/auth/register", app.base))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "pw",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = http
        .post(format!("{}/auth/login", app.base))
        .json(&json!({"username": username, "password": "pw"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["token"].as_str().unwrap().to_string()
}
