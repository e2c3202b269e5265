use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::auth::{AuthError, ProfileUpdate, PublicUser};
use crate::state::{AppState, AuthContext, AuthResponse, JsonResult, ProfileUpdateRequest};
use crate::user_data::{AlbumBookmark, BookmarkKind, HistoryEntry};
use crate::utils::json_error;

const PROFILE_HISTORY_LIMIT: usize = 10;

#[derive(Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: PublicUser,
    pub histories: Vec<HistoryEntry>,
    pub favorites: Vec<AlbumBookmark>,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub profile: Profile,
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> JsonResult<ProfileResponse> {
    let user = match state.auth.get_user(&ctx.user.id) {
        Ok(Some(user)) => user,
        Ok(None) => return Err(json_error(StatusCode::NOT_FOUND, "profile not found")),
        Err(err) => {
            error!("profile lookup failed: {}", err);
            return Err(json_error(StatusCode::INTERNAL_SERVER_ERROR, "could not load profile"));
        }
    };
    let histories = state
        .user_data
        .list_history(&user.id, PROFILE_HISTORY_LIMIT);
    let favorites = state
        .user_data
        .list_bookmarks(BookmarkKind::Favorite, &user.id, None);
    let (histories, favorites) = match (histories, favorites) {
        (Ok(histories), Ok(favorites)) => (histories, favorites),
        (Err(err), _) | (_, Err(err)) => {
            error!("profile lookup failed: {}", err);
            return Err(json_error(StatusCode::INTERNAL_SERVER_ERROR, "could not load profile"));
        }
    };

    Ok(Json(ProfileResponse {
        profile: Profile {
            user: PublicUser::from(&user),
            histories,
            favorites,
        },
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<ProfileUpdateRequest>,
) -> JsonResult<AuthResponse> {
    let update = ProfileUpdate {
        username: payload.username,
        email: payload.email,
        avatar_url: payload.avatar_url,
        bio: payload.bio,
    };
    match state.auth.update_profile(&ctx.user.id, update) {
        Ok(user) => Ok(Json(AuthResponse {
            message: "profile updated",
            user: PublicUser::from(&user),
            token: None,
        })),
        Err(AuthError::UserExists) | Err(AuthError::UserNotFound) => {
            Err(json_error(StatusCode::BAD_REQUEST, "failed to update profile"))
        }
        Err(err) => {
            error!("profile update failed: {}", err);
            Err(json_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to update profile"))
        }
    }
}
