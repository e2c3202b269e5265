use axum::{
    extract::{Extension, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

use crate::api::{clear_session_cookie, extract_token, session_cookie_header};
use crate::auth::{AuthError, PublicUser};
use crate::oauth::resize_avatar;
use crate::state::{
    AppState, AuthContext, AuthResponse, LoginRequest, MessageResponse, OAuthCallbackQuery,
    RegisterRequest,
};
use crate::utils::{json_error_response, redirect_to};

const LOGIN_SUCCESS_PATH: &str = "/auth/login-success";
const LOGIN_FAILED_PATH: &str = "/auth/login-failed";

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Response {
    match state
        .auth
        .register(&payload.username, &payload.email, &payload.password)
    {
        Ok(user) => {
            info!("registered user {}", user.username);
            (
                StatusCode::CREATED,
                Json(AuthResponse {
                    message: "user created",
                    user: PublicUser::from(&user),
                    token: None,
                }),
            )
                .into_response()
        }
        Err(AuthError::MissingFields) => {
            json_error_response(StatusCode::BAD_REQUEST, "missing fields")
        }
        Err(AuthError::UserExists) => {
            json_error_response(StatusCode::BAD_REQUEST, "user already exists")
        }
        Err(err) => json_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("auth error: {}", err),
        ),
    }
}

pub async fn login(State(state): State<AppState>, Json(payload): Json<LoginRequest>) -> Response {
    let user = match state
        .auth
        .authenticate(&payload.username, &payload.password)
    {
        Ok(Some(user)) => user,
        Ok(None) => return json_error_response(StatusCode::UNAUTHORIZED, "invalid credentials"),
        Err(err) => {
            return json_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("auth error: {}", err),
            )
        }
    };

    let session = match state.auth.create_session(&user.id) {
        Ok(session) => session,
        Err(err) => {
            return json_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("auth error: {}", err),
            )
        }
    };

    let cookie = session_cookie_header(
        &session,
        state.auth.session_ttl(),
        state.config.secure_cookies,
    );
    let mut response = Json(AuthResponse {
        message: "login succeeded",
        user: PublicUser::from(&user),
        token: Some(session.token),
    })
    .into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    response
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = match extract_token(&headers) {
        Some(token) => token,
        None => return json_error_response(StatusCode::BAD_REQUEST, "missing token"),
    };

    if let Err(err) = state.auth.revoke_session(&token) {
        return json_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("auth error: {}", err),
        );
    }

    let mut response = Json(MessageResponse {
        message: "logged out",
    })
    .into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, clear_session_cookie());
    response
}

pub async fn google_start(State(state): State<AppState>) -> Response {
    let oauth = match &state.oauth {
        Some(oauth) => oauth,
        None => {
            return json_error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "google login is not configured",
            )
        }
    };
    match oauth.authorize_url() {
        Ok(url) => redirect_to(&url),
        Err(err) => json_error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Response {
    let oauth = match &state.oauth {
        Some(oauth) => oauth,
        None => {
            return json_error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "google login is not configured",
            )
        }
    };
    if let Some(error) = query.error {
        warn!("google login refused: {}", error);
        return redirect_to(LOGIN_FAILED_PATH);
    }
    let (code, oauth_state) = match (query.code, query.state) {
        (Some(code), Some(oauth_state)) => (code, oauth_state),
        _ => return redirect_to(LOGIN_FAILED_PATH),
    };
    if !oauth.take_state(&oauth_state) {
        warn!("google callback with unknown state");
        return redirect_to(LOGIN_FAILED_PATH);
    }

    let profile = match oauth.exchange(&code).await {
        Ok(profile) => profile,
        Err(err) => {
            warn!("google code exchange failed: {}", err);
            return redirect_to(LOGIN_FAILED_PATH);
        }
    };
    let avatar = profile.picture.as_deref().map(resize_avatar);
    let session = match state
        .auth
        .upsert_google_user(&profile.email, &profile.name, avatar)
        .and_then(|user| state.auth.create_session(&user.id))
    {
        Ok(session) => session,
        Err(err) => {
            warn!("google login could not open a session: {}", err);
            return redirect_to(LOGIN_FAILED_PATH);
        }
    };

    let mut response = redirect_to(LOGIN_SUCCESS_PATH);
    response.headers_mut().insert(
        header::SET_COOKIE,
        session_cookie_header(&session, state.auth.session_ttl(), state.config.secure_cookies),
    );
    response
}

pub async fn login_success(Extension(ctx): Extension<AuthContext>) -> Json<AuthResponse> {
    Json(AuthResponse {
        message: "oauth login succeeded",
        user: PublicUser::from(&ctx.user),
        token: None,
    })
}

pub async fn login_failed() -> Response {
    json_error_response(StatusCode::UNAUTHORIZED, "oauth login failed")
}

#[cfg(test)]
mod tests {
    use reqwest::{redirect::Policy, Client, Url};
    use serde_json::{json, Value};

    use crate::api::test_support::{login, spawn_app, upstream_stub};

    #[tokio::test]
    async fn register_validates_and_rejects_duplicates() {
        let upstream = upstream_stub().await;
        let app = spawn_app(&upstream).await;
        let http = Client::new();

        let response = http
            .post(format!("{}/auth/register", app.base))
            .json(&json!({"username": "ana", "email": "ana@example.com", "password": "pw"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["user"]["username"], "ana");
        assert!(body["user"].get("passwordHash").is_none());
        assert!(body["user"].get("password_hash").is_none());

        let response = http
            .post(format!("{}/auth/register", app.base))
            .json(&json!({"username": "ana", "email": "x@example.com", "password": "pw"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);

        let response = http
            .post(format!("{}/auth/register", app.base))
            .json(&json!({"username": "bea"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn login_sets_cookie_and_logout_revokes() {
        let upstream = upstream_stub().await;
        let app = spawn_app(&upstream).await;
        let http = Client::new();

        http.post(format!("{}/auth/register", app.base))
            .json(&json!({"username": "caio", "email": "caio@example.com", "password": "pw"}))
            .send()
            .await
            .unwrap();

        let bad = http
            .post(format!("{}/auth/login", app.base))
            .json(&json!({"username": "caio", "password": "nope"}))
            .send()
            .await
            .unwrap();
        assert_eq!(bad.status(), 401);

        let response = http
            .post(format!("{}/auth/login", app.base))
            .json(&json!({"username": "caio", "password": "pw"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let cookie = response.headers()["set-cookie"].to_str().unwrap().to_string();
        assert!(cookie.starts_with("bandline_session="));
        assert!(cookie.contains("HttpOnly"));
        let body: Value = response.json().await.unwrap();
        let token = body["token"].as_str().unwrap().to_string();
        assert!(cookie.contains(&token));

        let session_cookie = format!("bandline_session={}", token);
        let me = http
            .get(format!("{}/auth/login-success", app.base))
            .header("cookie", &session_cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(me.status(), 200);

        let out = http
            .post(format!("{}/auth/logout", app.base))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(out.status(), 200);
        assert!(out.headers()["set-cookie"].to_str().unwrap().contains("Max-Age=0"));

        let me = http
            .get(format!("{}/auth/login-success", app.base))
            .header("cookie", &session_cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(me.status(), 401);
    }

    #[tokio::test]
    async fn google_flow_creates_user_with_resized_avatar() {
        let upstream = upstream_stub().await;
        let app = spawn_app(&upstream).await;
        let http = Client::builder().redirect(Policy::none()).build().unwrap();

        let start = http
            .get(format!("{}/auth/google", app.base))
            .send()
            .await
            .unwrap();
        assert_eq!(start.status(), 302);
        let location = Url::parse(start.headers()["location"].to_str().unwrap()).unwrap();
        let state = location
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .unwrap();

        let callback = http
            .get(format!("{}/auth/google/callback?code=good&state={}", app.base, state))
            .send()
            .await
            .unwrap();
        assert_eq!(callback.status(), 302);
        assert_eq!(callback.headers()["location"], "/auth/login-success");
        let cookie = callback.headers()["set-cookie"].to_str().unwrap();
        let cookie = cookie.split(';').next().unwrap().to_string();

        let body: Value = http
            .get(format!("{}/auth/login-success", app.base))
            .header("cookie", cookie)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["user"]["provider"], "google");
        assert_eq!(
            body["user"]["avatarUrl"],
            "https://lh3.googleusercontent.com/a/pic=s200-c"
        );

        // the state was consumed by the first callback
        let replay = http
            .get(format!("{}/auth/google/callback?code=good&state={}", app.base, state))
            .send()
            .await
            .unwrap();
        assert_eq!(replay.headers()["location"], "/auth/login-failed");
    }

    #[tokio::test]
    async fn google_exchange_failure_redirects_to_failed() {
        let upstream = upstream_stub().await;
        let app = spawn_app(&upstream).await;
        let http = Client::builder().redirect(Policy::none()).build().unwrap();
        let oauth = app.state.oauth.as_ref().unwrap();
        let url = Url::parse(&oauth.authorize_url().unwrap()).unwrap();
        let state = url
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .unwrap();

        let callback = http
            .get(format!("{}/auth/google/callback?code=bad&state={}", app.base, state))
            .send()
            .await
            .unwrap();
        assert_eq!(callback.headers()["location"], "/auth/login-failed");

        let failed = http
            .get(format!("{}/auth/login-failed", app.base))
            .send()
            .await
            .unwrap();
        assert_eq!(failed.status(), 401);

        // a registered user still logs in normally alongside
        assert_eq!(login(&app, "dora").await.len(), 32);
    }
}
