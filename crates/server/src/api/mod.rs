pub mod auth;
pub mod catalog;
pub mod profile;
pub mod user_data;

#[cfg(test)]
pub(crate) mod test_support;

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::SessionToken;
use crate::state::{AppState, AuthContext, HealthResponse};
use crate::utils::json_error_response;

pub const SESSION_COOKIE: &str = "bandline_session";

pub fn api_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/artists/:artist_id", get(catalog::get_artist))
        .route("/searchArtists", get(catalog::search_artists))
        .route("/artistAlbums/:artist_id", get(catalog::artist_albums))
        .route("/albumTracks/:album_id", get(catalog::album_tracks))
        .route("/relatedArtists/:artist_id", get(catalog::related_artists))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/google", get(auth::google_start))
        .route("/auth/google/callback", get(auth::google_callback))
        .route("/auth/login-failed", get(auth::login_failed));

    let protected = Router::new()
        .route("/auth/login-success", get(auth::login_success))
        .route(
            "/history",
            get(user_data::list_history).post(user_data::add_history),
        )
        .route(
            "/favorites",
            get(user_data::list_favorites)
                .post(user_data::add_favorite)
                .delete(user_data::remove_favorite),
        )
        .route(
            "/completedAlbums",
            get(user_data::list_completed)
                .post(user_data::add_completed)
                .delete(user_data::remove_completed),
        )
        .route("/completedAlbums/check", post(user_data::check_completed))
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new().merge(public).merge(protected).with_state(state)
}

/// The full application: routes plus CORS, request ids and request tracing.
pub fn app_router(state: AppState) -> Router {
    let cors_origin = state.config.cors_origin.clone();
    let mut app = api_router(state);
    match HeaderValue::from_str(&cors_origin) {
        Ok(origin) if !cors_origin.trim().is_empty() => {
            app = app.layer(
                CorsLayer::new()
                    .allow_origin(origin)
                    .allow_credentials(true)
                    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
            );
        }
        _ => warn!("CORS disabled: invalid origin {:?}", cors_origin),
    }
    app.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
}

async fn require_auth(
    State(state): State<AppState>,
    mut req: axum::http::Request<Body>,
    next: Next,
) -> Response {
    let token = match extract_token(req.headers()) {
        Some(token) => token,
        None => return json_error_response(StatusCode::UNAUTHORIZED, "not authenticated"),
    };

    match state.auth.user_from_token(&token) {
        Ok(Some(user)) => {
            req.extensions_mut().insert(AuthContext { user });
            next.run(req).await
        }
        Ok(None) => json_error_response(StatusCode::UNAUTHORIZED, "not authenticated"),
        Err(err) => json_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("auth error: {}", err),
        ),
    }
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }
    let cookie = headers.get(header::COOKIE)?.to_str().ok()?;
    parse_cookie_value(cookie, SESSION_COOKIE)
}

fn parse_cookie_value(cookie: &str, name: &str) -> Option<String> {
    for part in cookie.split(';') {
        let mut iter = part.trim().splitn(2, '=');
        let key = iter.next()?.trim();
        let value = iter.next().unwrap_or("").trim();
        if key == name && !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

pub fn session_cookie_header(session: &SessionToken, ttl: Duration, secure: bool) -> HeaderValue {
    let value = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        SESSION_COOKIE,
        session.token,
        ttl.as_secs(),
        if secure { "; Secure" } else { "" }
    );
    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("bandline_session=invalid; Path=/; HttpOnly"))
}

pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("bandline_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
