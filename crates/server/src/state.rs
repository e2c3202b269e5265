use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;
use catalog::{CatalogClient, DescriptionEnricher};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{AuthStore, AuthUser, PublicUser};
use crate::config::ServerConfig;
use crate::oauth::GoogleOAuth;
use crate::user_data::UserDataStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub auth: AuthStore,
    pub user_data: UserDataStore,
    pub catalog: CatalogClient,
    pub enricher: DescriptionEnricher,
    pub oauth: Option<GoogleOAuth>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Clone)]
pub struct AuthContext {
    pub user: AuthUser,
}

#[derive(Deserialize)]
pub struct LangQuery {
    pub lang: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddHistoryRequest {
    #[serde(default)]
    pub artist_id: String,
    #[serde(default)]
    pub artist_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRequest {
    #[serde(default)]
    pub album_id: String,
    #[serde(default)]
    pub album_name: String,
    pub album_image: Option<String>,
    pub album_tracks: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBookmarkRequest {
    #[serde(default)]
    pub album_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckCompletedRequest {
    #[serde(default)]
    pub album_ids: Vec<String>,
}

#[derive(Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: PublicUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub type JsonResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;
