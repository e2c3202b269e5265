use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use reqwest::Client;
use serde_json::json;

use crate::client::{CatalogClient, CatalogSettings};
use crate::description::DescriptionEnricher;
use crate::token::Credentials;

#[derive(Clone, Default)]
pub(crate) struct HitCounter(pub Arc<AtomicUsize>);

impl HitCounter {
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn load(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub(crate) async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}

/// Token endpoint that only accepts `id:secret` with the client-credentials grant.
pub(crate) fn token_router(hits: HitCounter, expires_in: u64) -> Router {
    Router::new().route(
        "/api/token",
        post(move |headers: HeaderMap, body: String| {
            let hits = hits.clone();
            async move {
                let basic = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|value| value.to_str().ok());
                if basic != Some("Basic aWQ6c2VjcmV0") || body != "grant_type=client_credentials" {
                    return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid_client"})));
                }
                let n = hits.hit();
                (
                    StatusCode::OK,
                    Json(json!({
                        "access_token": format!("tok-{}", n),
                        "token_type": "Bearer",
                        "expires_in": expires_in,
                    })),
                )
            }
        }),
    )
}

pub(crate) fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

pub(crate) fn catalog_client(base: &str) -> CatalogClient {
    CatalogClient::from_settings(
        Client::new(),
        &CatalogSettings {
            api_base: format!("{}/v1", base),
            token_url: format!("{}/api/token", base),
            credentials: Credentials {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            },
            timeout: Duration::from_secs(5),
            retries: 0,
        },
    )
}

pub(crate) fn enricher(base: &str) -> DescriptionEnricher {
    DescriptionEnricher::new(
        Client::new(),
        format!("{}/2.0/", base),
        "lastfm-key",
        Duration::from_secs(5),
        0,
    )
}

pub(crate) fn artist_json(id: &str, name: &str, genres: &[&str]) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "followers": {"href": null, "total": 100},
        "popularity": 50,
        "images": [{"url": "u", "height": 640, "width": 640}],
        "genres": genres,
    })
}
